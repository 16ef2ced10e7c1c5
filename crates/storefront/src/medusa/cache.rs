//! Cache types for catalog responses.

use super::catalog::{CategoryQuery, ProductQuery};
use super::types::{Banner, CategoryPage, Collection, ProductPage, Region};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Regions,
    Region(String),
    Products(ProductQuery),
    Categories(CategoryQuery),
    Collection(String),
    Banners(Option<String>),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Regions(Vec<Region>),
    Region(Box<Region>),
    Products(ProductPage),
    Categories(CategoryPage),
    Collection(Box<Collection>),
    Banners(Vec<Banner>),
}

//! Catalog reads: regions, products, categories, collections, banners and
//! reviews.

use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use dbk_core::pagination::page_offset;
use dbk_core::{CategoryId, CollectionId, ProductId, RegionId};

use super::MedusaError;
use super::cache::{CacheKey, CacheValue};
use super::client::MedusaClient;
use super::customer::CustomerToken;
use super::types::{
    Banner, BannerList, CategoryPage, Collection, CollectionList, Product, ProductCategory,
    ProductPage, Region, RegionEnvelope, RegionList, ReviewInput, ReviewPage,
};

/// Products per page on listing screens.
pub const LISTING_PAGE_SIZE: u32 = 20;
/// Categories per page in the navigation row.
pub const CATEGORY_PAGE_SIZE: u32 = 30;
/// Reviews per page on the product screen.
pub const REVIEW_PAGE_SIZE: u32 = 10;
/// Related products fetched for the product screen.
pub const RELATED_LIMIT: u32 = 8;

const LISTING_FIELDS: &str = "id,title,handle,thumbnail,images.*,metadata,*variants.calculated_price";
const DETAIL_FIELDS: &str = "*variants.calculated_price,*variants.options,*options,*images,categories.*,*metadata";

/// Filters for a product listing request.
///
/// Hashable so identical listings share a cache entry.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ProductQuery {
    pub handle: Option<String>,
    pub q: Option<String>,
    pub collection_id: Option<CollectionId>,
    pub category_ids: Vec<CategoryId>,
    pub region_id: Option<RegionId>,
    pub limit: u32,
    pub offset: u32,
    detail: bool,
}

impl ProductQuery {
    /// First page of a listing priced for `region_id`.
    #[must_use]
    pub const fn listing(region_id: Option<RegionId>) -> Self {
        Self {
            handle: None,
            q: None,
            collection_id: None,
            category_ids: Vec::new(),
            region_id,
            limit: LISTING_PAGE_SIZE,
            offset: 0,
            detail: false,
        }
    }

    /// A single product with options, categories and metadata.
    #[must_use]
    pub fn by_handle(handle: &str, region_id: Option<RegionId>) -> Self {
        Self {
            handle: Some(handle.to_string()),
            limit: 1,
            detail: true,
            ..Self::listing(region_id)
        }
    }

    #[must_use]
    pub fn in_collection(mut self, id: CollectionId) -> Self {
        self.collection_id = Some(id);
        self
    }

    #[must_use]
    pub fn in_category(mut self, id: CategoryId) -> Self {
        self.category_ids.push(id);
        self
    }

    /// Free-text search; blank terms are ignored.
    #[must_use]
    pub fn matching(mut self, q: &str) -> Self {
        let q = q.trim();
        self.q = (!q.is_empty()).then(|| q.to_string());
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Jump to a 1-based page of `limit` items.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.offset = page_offset(page, self.limit);
        self
    }

    fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("limit", &self.limit.to_string());
        pairs.append_pair("offset", &self.offset.to_string());
        pairs.append_pair(
            "fields",
            if self.detail { DETAIL_FIELDS } else { LISTING_FIELDS },
        );
        if let Some(handle) = &self.handle {
            pairs.append_pair("handle", handle);
        }
        if let Some(q) = &self.q {
            pairs.append_pair("q", q);
        }
        if let Some(id) = &self.collection_id {
            pairs.append_pair("collection_id[]", id.as_str());
        }
        for id in &self.category_ids {
            pairs.append_pair("category_id[]", id.as_str());
        }
        if let Some(region_id) = &self.region_id {
            pairs.append_pair("region_id", region_id.as_str());
        }
    }
}

/// Filters for a category listing request.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CategoryQuery {
    pub handle: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl CategoryQuery {
    /// A 1-based page of categories ordered by name.
    #[must_use]
    pub const fn page(page: u32) -> Self {
        Self {
            handle: None,
            limit: CATEGORY_PAGE_SIZE,
            offset: page_offset(page, CATEGORY_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn by_handle(handle: &str) -> Self {
        Self {
            handle: Some(handle.to_string()),
            limit: 1,
            offset: 0,
        }
    }

    fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("limit", &self.limit.to_string());
        pairs.append_pair("offset", &self.offset.to_string());
        pairs.append_pair("order", "name");
        if let Some(handle) = &self.handle {
            pairs.append_pair("handle", handle);
        }
    }
}

impl MedusaClient {
    // =========================================================================
    // Region Methods
    // =========================================================================

    /// List all regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> Result<Vec<Region>, MedusaError> {
        if let Some(CacheValue::Regions(regions)) = self.cache_get(&CacheKey::Regions).await {
            debug!("Cache hit for regions");
            return Ok(regions);
        }

        let url = self.endpoint(&["store", "regions"])?;
        let list: RegionList = self.execute(self.request(Method::GET, url, None)).await?;

        self.cache_put(CacheKey::Regions, CacheValue::Regions(list.regions.clone()))
            .await;
        Ok(list.regions)
    }

    /// Reach the backend with the publishable key, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the key.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), MedusaError> {
        let mut url = self.endpoint(&["store", "regions"])?;
        url.query_pairs_mut().append_pair("limit", "1");
        self.execute_empty(self.request(Method::GET, url, None)).await
    }

    /// Get a region by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, or an error if the request fails.
    #[instrument(skip(self), fields(region_id = %id))]
    pub async fn get_region(&self, id: &RegionId) -> Result<Region, MedusaError> {
        let key = CacheKey::Region(id.to_string());
        if let Some(CacheValue::Region(region)) = self.cache_get(&key).await {
            debug!("Cache hit for region");
            return Ok(*region);
        }

        let url = self.endpoint(&["store", "regions", id.as_str()])?;
        let envelope: RegionEnvelope = self.execute(self.request(Method::GET, url, None)).await?;

        self.cache_put(key, CacheValue::Region(Box::new(envelope.region.clone())))
            .await;
        Ok(envelope.region)
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products matching a query.
    ///
    /// Search results are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, MedusaError> {
        let key = CacheKey::Products(query.clone());
        let cacheable = query.q.is_none();

        if cacheable && let Some(CacheValue::Products(page)) = self.cache_get(&key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.endpoint(&["store", "products"])?;
        query.apply(&mut url);
        let page: ProductPage = self.execute(self.request(Method::GET, url, None)).await?;

        if cacheable {
            self.cache_put(key, CacheValue::Products(page.clone())).await;
        }
        Ok(page)
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no product has the handle, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(
        &self,
        handle: &str,
        region_id: Option<&RegionId>,
    ) -> Result<Product, MedusaError> {
        let query = ProductQuery::by_handle(handle, region_id.cloned());
        self.list_products(&query)
            .await?
            .products
            .into_iter()
            .next()
            .ok_or_else(|| MedusaError::NotFound(format!("Product not found: {handle}")))
    }

    /// Products sharing `product`'s first category, excluding itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn related_products(
        &self,
        product: &Product,
        region_id: Option<&RegionId>,
    ) -> Result<Vec<Product>, MedusaError> {
        let Some(category) = product.primary_category() else {
            return Ok(Vec::new());
        };

        let query = ProductQuery::listing(region_id.cloned())
            .in_category(category.id.clone())
            .with_limit(RELATED_LIMIT);
        let page = self.list_products(&query).await?;

        Ok(page
            .products
            .into_iter()
            .filter(|p| p.id != product.id)
            .collect())
    }

    // =========================================================================
    // Collection & Category Methods
    // =========================================================================

    /// Get a collection by its handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no collection has the handle, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_collection_by_handle(&self, handle: &str) -> Result<Collection, MedusaError> {
        let key = CacheKey::Collection(handle.to_string());
        if let Some(CacheValue::Collection(collection)) = self.cache_get(&key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let mut url = self.endpoint(&["store", "collections"])?;
        url.query_pairs_mut()
            .append_pair("handle", handle)
            .append_pair("limit", "1")
            .append_pair("fields", "id,title,handle");
        let list: CollectionList = self.execute(self.request(Method::GET, url, None)).await?;

        let collection = list
            .collections
            .into_iter()
            .next()
            .ok_or_else(|| MedusaError::NotFound(format!("Collection not found: {handle}")))?;

        self.cache_put(key, CacheValue::Collection(Box::new(collection.clone())))
            .await;
        Ok(collection)
    }

    /// List product categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self, query: &CategoryQuery) -> Result<CategoryPage, MedusaError> {
        let key = CacheKey::Categories(query.clone());
        if let Some(CacheValue::Categories(page)) = self.cache_get(&key).await {
            debug!("Cache hit for categories");
            return Ok(page);
        }

        let mut url = self.endpoint(&["store", "product-categories"])?;
        query.apply(&mut url);
        let page: CategoryPage = self.execute(self.request(Method::GET, url, None)).await?;

        self.cache_put(key, CacheValue::Categories(page.clone())).await;
        Ok(page)
    }

    /// Get a category by its handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no category has the handle, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_category_by_handle(&self, handle: &str) -> Result<ProductCategory, MedusaError> {
        self.list_categories(&CategoryQuery::by_handle(handle))
            .await?
            .product_categories
            .into_iter()
            .next()
            .ok_or_else(|| MedusaError::NotFound(format!("Category not found: {handle}")))
    }

    // =========================================================================
    // Banner Methods
    // =========================================================================

    /// List promotional banners, optionally for one collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_banners(
        &self,
        collection_handle: Option<&str>,
    ) -> Result<Vec<Banner>, MedusaError> {
        let key = CacheKey::Banners(collection_handle.map(str::to_string));
        if let Some(CacheValue::Banners(banners)) = self.cache_get(&key).await {
            debug!("Cache hit for banners");
            return Ok(banners);
        }

        let mut url = self.endpoint(&["store", "banners"])?;
        if let Some(handle) = collection_handle {
            url.query_pairs_mut().append_pair("collection_handle", handle);
        }
        let list: BannerList = self.execute(self.request(Method::GET, url, None)).await?;

        self.cache_put(key, CacheValue::Banners(list.banners.clone()))
            .await;
        Ok(list.banners)
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// A 1-based page of `limit` approved reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_product_reviews(
        &self,
        product_id: &ProductId,
        page: u32,
        limit: u32,
    ) -> Result<ReviewPage, MedusaError> {
        let mut url = self.endpoint(&["store", "products", product_id.as_str(), "reviews"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &page_offset(page, limit).to_string())
            .append_pair("order", "-created_at");
        self.execute(self.request(Method::GET, url, None)).await
    }

    /// Submit a review on behalf of a signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is rejected, or an error if the
    /// API request fails.
    #[instrument(skip(self, token, input), fields(product_id = %input.product_id))]
    pub async fn submit_review(
        &self,
        token: &CustomerToken,
        input: &ReviewInput,
    ) -> Result<(), MedusaError> {
        let url = self.endpoint(&["store", "reviews"])?;
        self.execute_empty(self.request(Method::POST, url, Some(token)).json(input))
            .await
    }
}

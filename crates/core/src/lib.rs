//! dbk core - domain types and catalog display rules.
//!
//! Shared by the storefront binary and its tests. Everything here is pure:
//! no I/O, no HTTP clients, no sessions. The commerce backend owns prices,
//! carts and orders; this crate only decides how to present them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email and money
//! - [`pricing`] - Lowest variant price and discount percentage
//! - [`pagination`] - "Load more" accumulation without duplicates
//! - [`variant`] - Option selection and variant resolution
//! - [`carousel`] - Wrapping slide index
//! - [`rating`] - Star fills and labels
//! - [`address`] - Draft address rules and country resolution
//! - [`media`] - Absolute media URLs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod carousel;
pub mod media;
pub mod pagination;
pub mod pricing;
pub mod rating;
pub mod types;
pub mod variant;

pub use types::*;

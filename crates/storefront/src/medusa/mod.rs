//! Medusa Store API client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; every request carries the publishable key
//! - Medusa is the source of truth: no local copies of carts or orders
//! - Catalog reads (regions, products, categories, collections, banners) are
//!   cached in-process via `moka`; carts, customers and reviews never are
//!
//! # Example
//!
//! ```rust,ignore
//! use dbk_storefront::medusa::MedusaClient;
//!
//! let client = MedusaClient::new(&config.medusa)?;
//! let regions = client.list_regions().await?;
//! let cart = client.create_cart(&regions[0].id).await?;
//! ```

mod cache;
mod cart;
mod catalog;
mod client;
mod customer;
pub mod types;

pub use catalog::{
    CATEGORY_PAGE_SIZE, CategoryQuery, LISTING_PAGE_SIZE, ProductQuery, RELATED_LIMIT,
    REVIEW_PAGE_SIZE,
};
pub use client::MedusaClient;
pub use customer::CustomerToken;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the Medusa backend.
#[derive(Debug, Error)]
pub enum MedusaError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the credentials (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Login answered with a redirect location (third-party auth).
    #[error("Authentication requires additional steps")]
    UnsupportedAuthFlow,

    /// A request URL could not be built from the configured backend URL.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl MedusaError {
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message safe to show a shopper.
    ///
    /// Client-error messages from the backend are passed through ("Cart is
    /// already completed"); server errors and transport failures are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(message) | Self::NotFound(message) if !message.is_empty() => {
                message.clone()
            }
            Self::Api { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            Self::Unauthorized(_) => "Please sign in and try again.".to_string(),
            Self::NotFound(_) => "That item could not be found.".to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
            Self::UnsupportedAuthFlow => {
                "Requires extra auth steps not supported in this flow.".to_string()
            }
            Self::Http(_) | Self::Api { .. } | Self::Parse(_) | Self::Url(_) => {
                "The store is unavailable right now. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_backend_text() {
        let err = MedusaError::Api {
            status: 400,
            message: "Cart is already completed".to_string(),
        };
        assert_eq!(err.user_message(), "Cart is already completed");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = MedusaError::Url("relative URL without a base".to_string());
        assert!(!err.user_message().contains("relative"));

        let err = MedusaError::Api {
            status: 500,
            message: "<html>stack trace</html>".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "The store is unavailable right now. Please try again."
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(MedusaError::Unauthorized(String::new()).is_unauthorized());
        assert!(MedusaError::NotFound("x".into()).is_not_found());
        assert!(!MedusaError::UnsupportedAuthFlow.is_unauthorized());
    }
}

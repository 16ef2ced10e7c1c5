//! Storefront-side models.
//!
//! Everything commerce-related lives in the backend and is mirrored by
//! [`crate::medusa::types`]; the only state the storefront owns is what it
//! keeps in the visitor's session.

pub mod session;

pub use session::CheckoutDraft;

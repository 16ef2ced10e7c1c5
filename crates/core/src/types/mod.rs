//! Core types for the dbk storefront.
//!
//! Type-safe wrappers for identifiers, email addresses and money.

pub mod email;
pub mod id;
pub mod money;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};

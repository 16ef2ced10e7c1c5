//! Newtype IDs for type-safe entity references.
//!
//! Commerce backend identifiers are opaque strings (`prod_01H...`,
//! `cart_01H...`). Use the `define_id!` macro to create wrappers that prevent
//! accidentally passing a cart ID where a variant ID is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use dbk_core::define_id;
/// define_id!(WishlistId);
/// define_id!(GiftCardId);
///
/// let wishlist = WishlistId::new("wl_123");
/// assert_eq!(wishlist.as_str(), "wl_123");
///
/// // These are different types, so this won't compile:
/// // let _: GiftCardId = wishlist;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(VariantId);
define_id!(CollectionId);
define_id!(CategoryId);
define_id!(CartId);
define_id!(LineItemId);
define_id!(RegionId);
define_id!(CustomerAddressId);
define_id!(ShippingOptionId);
define_id!(OrderId);
define_id!(ReviewId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = CartId::new("cart_01HX");
        assert_eq!(id.as_str(), "cart_01HX");
        assert_eq!(id.to_string(), "cart_01HX");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = VariantId::from("variant_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"variant_1\"");

        let parsed: VariantId = serde_json::from_str("\"variant_1\"").unwrap();
        assert_eq!(parsed, id);
    }
}

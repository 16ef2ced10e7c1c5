//! Session-related types.
//!
//! The session stands in for browser storage: it remembers which backend
//! cart, region and customer token belong to the visitor, plus the unsaved
//! checkout input.

use serde::{Deserialize, Serialize};

use dbk_core::address::DraftAddress;
use dbk_core::{CartId, CustomerAddressId};

/// Checkout input not yet written to the cart.
///
/// A draft belongs to one cart; a draft found next to a different cart id is
/// stale and gets discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub cart_id: Option<CartId>,
    pub email: Option<String>,
    pub selected_address_id: Option<CustomerAddressId>,
    pub manual_address: Option<DraftAddress>,
}

impl CheckoutDraft {
    #[must_use]
    pub fn for_cart(cart_id: CartId) -> Self {
        Self {
            cart_id: Some(cart_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn belongs_to(&self, cart_id: &CartId) -> bool {
        self.cart_id.as_ref() == Some(cart_id)
    }

    /// Store the trimmed email; blank input clears it.
    pub fn set_email(&mut self, email: &str) {
        let email = email.trim();
        self.email = (!email.is_empty()).then(|| email.to_string());
    }

    /// Pick a saved address. Any manual input is dropped.
    pub fn select_saved_address(&mut self, id: CustomerAddressId) {
        self.selected_address_id = Some(id);
        self.manual_address = None;
    }

    /// Overlay form input onto the manual address and stop using a saved one.
    pub fn merge_manual_address(&mut self, address: DraftAddress) {
        self.manual_address
            .get_or_insert_with(DraftAddress::default)
            .merge(address);
        self.selected_address_id = None;
    }
}

/// Session keys.
pub mod keys {
    /// Key for the backend cart id.
    pub const CART_ID: &str = "cart_id";

    /// Key for the backend region id.
    pub const REGION_ID: &str = "region_id";

    /// Key for the customer's bearer token.
    pub const CUSTOMER_TOKEN: &str = "customer_token";

    /// Key for the [`super::CheckoutDraft`].
    pub const CHECKOUT_DRAFT: &str = "checkout_draft";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_email_trims_and_clears() {
        let mut draft = CheckoutDraft::default();
        draft.set_email("  asha@example.com ");
        assert_eq!(draft.email.as_deref(), Some("asha@example.com"));
        draft.set_email("   ");
        assert!(draft.email.is_none());
    }

    #[test]
    fn test_saved_and_manual_addresses_are_exclusive() {
        let mut draft = CheckoutDraft::for_cart(CartId::new("cart_1"));
        draft.merge_manual_address(DraftAddress {
            city: Some("Pune".into()),
            ..DraftAddress::default()
        });
        draft.select_saved_address(CustomerAddressId::new("addr_1"));
        assert!(draft.manual_address.is_none());

        draft.merge_manual_address(DraftAddress {
            phone: Some("99".into()),
            ..DraftAddress::default()
        });
        assert!(draft.selected_address_id.is_none());
        // previous manual input was dropped by the saved selection
        assert!(draft.manual_address.as_ref().and_then(|a| a.city.as_ref()).is_none());
    }

    #[test]
    fn test_manual_address_merges_fields() {
        let mut draft = CheckoutDraft::default();
        draft.merge_manual_address(DraftAddress {
            city: Some("Pune".into()),
            phone: Some("99".into()),
            ..DraftAddress::default()
        });
        draft.merge_manual_address(DraftAddress {
            phone: Some("100".into()),
            ..DraftAddress::default()
        });
        let address = draft.manual_address.unwrap_or_default();
        assert_eq!(address.city.as_deref(), Some("Pune"));
        assert_eq!(address.phone.as_deref(), Some("100"));
    }

    #[test]
    fn test_belongs_to() {
        let draft = CheckoutDraft::for_cart(CartId::new("cart_1"));
        assert!(draft.belongs_to(&CartId::new("cart_1")));
        assert!(!draft.belongs_to(&CartId::new("cart_2")));
        assert!(!CheckoutDraft::default().belongs_to(&CartId::new("cart_1")));
    }
}

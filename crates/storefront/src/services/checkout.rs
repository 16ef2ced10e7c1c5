//! Checkout: draft input, syncing it onto the cart, and placing the order.
//!
//! Contact and address input is kept as a [`CheckoutDraft`] in the session
//! and only written to the backend cart when it is complete enough to use.
//! Concurrent syncs for one cart share a single backend write.

use std::sync::Arc;

use tower_sessions::Session;
use tracing::instrument;

use dbk_core::address::{DraftAddress, filled, resolve_country_code};
use dbk_core::{CartId, OrderId};

use crate::error::{AppError, add_breadcrumb};
use crate::medusa::{Cart, CartUpdate, CompleteCartOutcome, Customer, MedusaError};
use crate::models::CheckoutDraft;
use crate::models::session::keys;
use crate::state::AppState;

use super::cart::{CartProvider, NO_CART};

/// What happened when the shopper pressed "Pay Now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrder {
    Placed(OrderId),
    Rejected(String),
}

/// First reason the cart cannot be paid for yet.
#[must_use]
pub fn validate_for_payment(cart: Option<&Cart>) -> Option<&'static str> {
    let Some(cart) = cart else {
        return Some(NO_CART);
    };
    if cart.is_empty() {
        return Some("Your cart is empty.");
    }
    if filled(cart.email.as_deref()).is_none() {
        return Some("Please add your email.");
    }
    if cart.contact_phone().is_none() {
        return Some("Phone number is required in address.");
    }
    if cart.shipping_methods.is_empty() {
        return Some("Please select a shipping method.");
    }
    None
}

/// The cart fields a draft would change.
///
/// The email is written when it differs from the cart's. The address (the
/// chosen saved address, else the manual one) is written as both shipping
/// and billing address, and only once it is shippable.
#[must_use]
pub fn plan_sync(draft: &CheckoutDraft, cart: &Cart, customer: Option<&Customer>) -> CartUpdate {
    let mut update = CartUpdate::default();

    if let Some(email) = draft.email.as_deref()
        && cart.email.as_deref() != Some(email)
    {
        update.email = Some(email.to_string());
    }

    let address = match &draft.selected_address_id {
        Some(id) => customer
            .and_then(|c| c.address(id))
            .map(|saved| DraftAddress::from(&saved.address)),
        None => draft.manual_address.clone(),
    };

    if let Some(mut address) = address.filter(DraftAddress::is_shippable) {
        let countries = cart
            .region
            .as_ref()
            .map(|r| r.country_refs())
            .unwrap_or_default();
        let input = filled(address.country_code.as_deref()).unwrap_or_default();
        address.country_code = Some(resolve_country_code(input, &countries));

        update.billing_address = Some(address.clone());
        update.shipping_address = Some(address);
    }

    update
}

/// Session-scoped checkout operations.
pub struct CheckoutService<'a> {
    session: &'a Session,
    state: &'a AppState,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(session: &'a Session, state: &'a AppState) -> Self {
        Self { session, state }
    }

    /// The draft for `cart_id`. A draft left over from another cart is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load_draft(&self, cart_id: &CartId) -> Result<CheckoutDraft, AppError> {
        match self
            .session
            .get::<CheckoutDraft>(keys::CHECKOUT_DRAFT)
            .await?
        {
            Some(draft) if draft.belongs_to(cart_id) => Ok(draft),
            Some(_) => {
                tracing::debug!(cart_id = %cart_id, "Discarding draft of another cart");
                Ok(CheckoutDraft::for_cart(cart_id.clone()))
            }
            None => Ok(CheckoutDraft::for_cart(cart_id.clone())),
        }
    }

    /// Persist the draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save_draft(&self, draft: &CheckoutDraft) -> Result<(), AppError> {
        self.session.insert(keys::CHECKOUT_DRAFT, draft).await?;
        Ok(())
    }

    /// Load, change and save the draft for `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn update_draft(
        &self,
        cart_id: &CartId,
        change: impl FnOnce(&mut CheckoutDraft),
    ) -> Result<CheckoutDraft, AppError> {
        let mut draft = self.load_draft(cart_id).await?;
        change(&mut draft);
        self.save_draft(&draft).await?;
        Ok(draft)
    }

    /// Write the draft onto the cart.
    ///
    /// Returns the cart unchanged when there is nothing to write. A sync
    /// already running for the same cart is joined instead of repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, draft, cart, customer), fields(cart_id = %cart.id))]
    pub async fn sync_to_cart(
        &self,
        draft: &CheckoutDraft,
        cart: &Cart,
        customer: Option<&Customer>,
    ) -> Result<Cart, AppError> {
        let update = plan_sync(draft, cart, customer);
        if update.is_empty() {
            return Ok(cart.clone());
        }

        let client = self.state.medusa();
        self.state
            .checkout_sync()
            .run(cart.id.clone(), || async {
                client.update_cart(&cart.id, &update).await.map_err(Arc::new)
            })
            .await
            .map_err(|e| AppError::Medusa(unshare(e)))
    }

    /// Sync the draft, validate the cart and complete it.
    ///
    /// On success the visitor gets a fresh cart and the draft is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails; everything the
    /// shopper can fix comes back as [`PlaceOrder::Rejected`].
    #[instrument(skip(self, customer))]
    pub async fn place_order(&self, customer: Option<&Customer>) -> Result<PlaceOrder, AppError> {
        let carts = CartProvider::new(self.session, self.state.medusa());
        let Some(cart) = carts.peek().await? else {
            return Ok(PlaceOrder::Rejected(NO_CART.to_string()));
        };

        let draft = self.load_draft(&cart.id).await?;
        let cart = match self.sync_to_cart(&draft, &cart, customer).await {
            Ok(synced) => synced,
            Err(AppError::Medusa(e)) => return Ok(PlaceOrder::Rejected(e.user_message())),
            Err(e) => return Err(e),
        };

        if let Some(problem) = validate_for_payment(Some(&cart)) {
            return Ok(PlaceOrder::Rejected(problem.to_string()));
        }

        add_breadcrumb("checkout", "Completing cart", Some(&[("cart_id", cart.id.as_str())]));
        match self.state.medusa().complete_cart(&cart.id).await {
            Ok(CompleteCartOutcome::Order(order)) => {
                tracing::info!(order_id = %order.id, cart_id = %cart.id, "Order placed");
                if let Err(e) = carts.refresh().await {
                    tracing::warn!(error = %e, "Could not start a new cart after the order");
                }
                Ok(PlaceOrder::Placed(order.id))
            }
            Ok(CompleteCartOutcome::Cart { error, .. }) => {
                tracing::warn!(cart_id = %cart.id, error = ?error, "Cart completion refused");
                Ok(PlaceOrder::Rejected(
                    error.unwrap_or_else(|| "Could not complete order".to_string()),
                ))
            }
            Err(e) => {
                tracing::error!(cart_id = %cart.id, error = %e, "Cart completion failed");
                Ok(PlaceOrder::Rejected(payment_failure(&e)))
            }
        }
    }
}

fn payment_failure(error: &MedusaError) -> String {
    match error {
        MedusaError::Api { status, message } if *status < 500 && !message.is_empty() => {
            message.clone()
        }
        _ => "Payment failed".to_string(),
    }
}

/// Take back ownership of an error shared between joined syncs.
fn unshare(error: Arc<MedusaError>) -> MedusaError {
    Arc::try_unwrap(error).unwrap_or_else(|shared| match &*shared {
        MedusaError::Unauthorized(message) => MedusaError::Unauthorized(message.clone()),
        MedusaError::NotFound(message) => MedusaError::NotFound(message.clone()),
        MedusaError::RateLimited(seconds) => MedusaError::RateLimited(*seconds),
        MedusaError::Api { status, message } => MedusaError::Api {
            status: *status,
            message: message.clone(),
        },
        MedusaError::UnsupportedAuthFlow => MedusaError::UnsupportedAuthFlow,
        other => MedusaError::Api {
            status: 502,
            message: other.to_string(),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use dbk_core::CustomerAddressId;

    use crate::config::StorefrontConfig;
    use crate::middleware::create_session_store;

    use super::*;

    fn cart(value: serde_json::Value) -> Cart {
        serde_json::from_value(value).unwrap()
    }

    fn ready_cart() -> serde_json::Value {
        json!({
            "id": "cart_1",
            "email": "asha@example.com",
            "items": [{"id": "item_1", "quantity": 1}],
            "shipping_address": {"phone": "+91 98200 00000"},
            "shipping_methods": [{"id": "sm_1", "shipping_option_id": "so_1"}]
        })
    }

    fn shippable() -> DraftAddress {
        DraftAddress {
            address_1: Some("12 MG Road".into()),
            city: Some("Pune".into()),
            postal_code: Some("411001".into()),
            phone: Some("98200".into()),
            ..DraftAddress::default()
        }
    }

    #[test]
    fn test_validation_order() {
        assert_eq!(validate_for_payment(None), Some("No cart"));

        let mut value = ready_cart();
        assert_eq!(validate_for_payment(Some(&cart(value.clone()))), None);

        value["shipping_methods"] = json!([]);
        assert_eq!(
            validate_for_payment(Some(&cart(value.clone()))),
            Some("Please select a shipping method.")
        );

        value["shipping_address"] = json!(null);
        assert_eq!(
            validate_for_payment(Some(&cart(value.clone()))),
            Some("Phone number is required in address.")
        );

        value["email"] = json!("");
        assert_eq!(
            validate_for_payment(Some(&cart(value.clone()))),
            Some("Please add your email.")
        );

        value["items"] = json!([]);
        assert_eq!(
            validate_for_payment(Some(&cart(value))),
            Some("Your cart is empty.")
        );
    }

    #[test]
    fn test_phone_from_billing_address_counts() {
        let mut value = ready_cart();
        value["shipping_address"] = json!(null);
        value["billing_address"] = json!({"phone": "99"});
        assert_eq!(validate_for_payment(Some(&cart(value))), None);
    }

    #[test]
    fn test_plan_skips_unchanged_email_and_partial_address() {
        let cart = cart(json!({"id": "cart_1", "email": "asha@example.com"}));
        let mut draft = CheckoutDraft::for_cart(cart.id.clone());
        draft.set_email("asha@example.com");
        draft.merge_manual_address(DraftAddress {
            city: Some("Pune".into()),
            ..DraftAddress::default()
        });

        assert!(plan_sync(&draft, &cart, None).is_empty());
    }

    #[test]
    fn test_plan_writes_manual_address_as_shipping_and_billing() {
        let cart = cart(json!({
            "id": "cart_1",
            "region": {"id": "reg_1", "name": "India", "countries": [{"iso_2": "in", "display_name": "India"}]}
        }));
        let mut draft = CheckoutDraft::for_cart(cart.id.clone());
        draft.set_email("asha@example.com");
        draft.merge_manual_address(shippable());

        let update = plan_sync(&draft, &cart, None);
        assert_eq!(update.email.as_deref(), Some("asha@example.com"));
        let shipping = update.shipping_address.unwrap();
        assert_eq!(shipping.country_code.as_deref(), Some("in"));
        assert_eq!(Some(shipping), update.billing_address);
    }

    #[test]
    fn test_plan_copies_saved_address_from_customer() {
        let cart = cart(json!({"id": "cart_1"}));
        let customer: Customer = serde_json::from_value(json!({
            "id": "cus_1",
            "email": "asha@example.com",
            "addresses": [{
                "id": "addr_1", "address_1": "1 Hill Rd", "city": "Mumbai",
                "postal_code": "400050", "phone": "98", "country_code": "in"
            }]
        }))
        .unwrap();

        let mut draft = CheckoutDraft::for_cart(cart.id.clone());
        draft.select_saved_address(CustomerAddressId::new("addr_1"));

        let update = plan_sync(&draft, &cart, Some(&customer));
        assert_eq!(
            update.shipping_address.unwrap().city.as_deref(),
            Some("Mumbai")
        );

        // signed out: the saved address cannot be resolved
        assert!(plan_sync(&draft, &cart, None).is_empty());
    }

    #[test]
    fn test_payment_failure_message() {
        let err = MedusaError::Api {
            status: 400,
            message: "Payment session missing".into(),
        };
        assert_eq!(payment_failure(&err), "Payment session missing");
        assert_eq!(payment_failure(&MedusaError::Url("x".into())), "Payment failed");
    }

    #[test]
    fn test_unshare_keeps_variant() {
        let shared = Arc::new(MedusaError::NotFound("cart".into()));
        let _other = Arc::clone(&shared);
        assert!(unshare(shared).is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_syncs_for_one_cart_write_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1"))
            .and(body_partial_json(json!({"email": "asha@example.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"cart": {"id": "cart_1", "email": "asha@example.com"}}))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend_url = server.uri();
        let config = StorefrontConfig::from_lookup(&move |key: &str| match key {
            "MEDUSA_BACKEND_URL" => Some(backend_url.clone()),
            "MEDUSA_PUBLISHABLE_KEY" => Some("pk_test".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(config).unwrap();
        let session = Session::new(None, Arc::new(create_session_store()), None);
        let checkout = CheckoutService::new(&session, &state);

        let cart = cart(json!({"id": "cart_1"}));
        let mut draft = CheckoutDraft::for_cart(cart.id.clone());
        draft.set_email("asha@example.com");

        let (first, second) = tokio::join!(
            checkout.sync_to_cart(&draft, &cart, None),
            checkout.sync_to_cart(&draft, &cart, None),
        );

        assert_eq!(first.unwrap().email.as_deref(), Some("asha@example.com"));
        assert_eq!(second.unwrap().email.as_deref(), Some("asha@example.com"));
        assert_eq!(state.checkout_sync().in_flight(), 0);
    }
}

//! Cart, fulfillment and order placement. Nothing here is cached.

use reqwest::Method;
use serde_json::json;
use tracing::instrument;
use url::Url;

use dbk_core::{CartId, LineItemId, RegionId, ShippingOptionId, VariantId};

use super::MedusaError;
use super::client::MedusaClient;
use super::customer::CustomerToken;
use super::types::{
    Cart, CartEnvelope, CartUpdate, CompleteCartOutcome, CompleteCartResponse, ParentEnvelope,
    ShippingOption, ShippingOptionEnvelope, ShippingOptionList,
};

const CART_FIELDS: &str = "+items.*,+shipping_methods.*";

impl MedusaClient {
    fn cart_url(&self, id: &CartId, rest: &[&str]) -> Result<Url, MedusaError> {
        let mut segments = vec!["store", "carts", id.as_str()];
        segments.extend_from_slice(rest);
        let mut url = self.endpoint(&segments)?;
        url.query_pairs_mut().append_pair("fields", CART_FIELDS);
        Ok(url)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Create an empty cart in a region.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(region_id = %region_id))]
    pub async fn create_cart(&self, region_id: &RegionId) -> Result<Cart, MedusaError> {
        let mut url = self.endpoint(&["store", "carts"])?;
        url.query_pairs_mut().append_pair("fields", CART_FIELDS);
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "region_id": region_id })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Get a cart with its items and shipping methods.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, or an error if the request fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn get_cart(&self, id: &CartId) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &[])?;
        let envelope: CartEnvelope = self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.cart)
    }

    /// Update email, addresses or region.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, update), fields(cart_id = %id))]
    pub async fn update_cart(&self, id: &CartId, update: &CartUpdate) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &[])?;
        let envelope: CartEnvelope = self
            .execute(self.request(Method::POST, url, None).json(update))
            .await?;
        Ok(envelope.cart)
    }

    /// Add `quantity` of a variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails (e.g. out of stock).
    #[instrument(skip(self), fields(cart_id = %id, variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["line-items"])?;
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "variant_id": variant_id, "quantity": quantity })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %id, line_id = %line_id))]
    pub async fn update_line_item(
        &self,
        id: &CartId,
        line_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["line-items", line_id.as_str()])?;
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "quantity": quantity })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Remove a line. The backend answers with the parent cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %id, line_id = %line_id))]
    pub async fn delete_line_item(
        &self,
        id: &CartId,
        line_id: &LineItemId,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["line-items", line_id.as_str()])?;
        let envelope: ParentEnvelope<Cart> = self
            .execute(self.request(Method::DELETE, url, None))
            .await?;
        Ok(envelope.parent)
    }

    /// Apply promotion codes.
    ///
    /// # Errors
    ///
    /// Returns an error if a code is rejected or the request fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn apply_promotions(&self, id: &CartId, codes: &[&str]) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["promotions"])?;
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "promo_codes": codes })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Remove promotion codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn remove_promotions(&self, id: &CartId, codes: &[&str]) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["promotions"])?;
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::DELETE, url, None)
                    .json(&json!({ "promo_codes": codes })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Select a shipping option for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is not valid for the cart or the
    /// request fails.
    #[instrument(skip(self), fields(cart_id = %id, option_id = %option_id))]
    pub async fn add_shipping_method(
        &self,
        id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["shipping-methods"])?;
        let envelope: CartEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "option_id": option_id })),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Assign a guest cart to the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(cart_id = %id))]
    pub async fn transfer_cart(
        &self,
        id: &CartId,
        token: &CustomerToken,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(id, &["customer"])?;
        let envelope: CartEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)))
            .await?;
        Ok(envelope.cart)
    }

    /// Turn the cart into an order.
    ///
    /// A refused completion is not an error: the backend answers with the
    /// cart and a reason, returned as [`CompleteCartOutcome::Cart`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn complete_cart(&self, id: &CartId) -> Result<CompleteCartOutcome, MedusaError> {
        let url = self.endpoint(&["store", "carts", id.as_str(), "complete"])?;
        let response: CompleteCartResponse = self
            .execute(self.request(Method::POST, url, None))
            .await?;
        Ok(response.into())
    }

    // =========================================================================
    // Fulfillment Methods
    // =========================================================================

    /// Shipping options available to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        let mut url = self.endpoint(&["store", "shipping-options"])?;
        url.query_pairs_mut().append_pair("cart_id", cart_id.as_str());
        let list: ShippingOptionList = self.execute(self.request(Method::GET, url, None)).await?;
        Ok(list.shipping_options)
    }

    /// Price a `calculated` shipping option for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot price the option or the
    /// request fails.
    #[instrument(skip(self), fields(option_id = %option_id, cart_id = %cart_id))]
    pub async fn calculate_shipping_option(
        &self,
        option_id: &ShippingOptionId,
        cart_id: &CartId,
    ) -> Result<ShippingOption, MedusaError> {
        let url = self.endpoint(&["store", "shipping-options", option_id.as_str(), "calculate"])?;
        let envelope: ShippingOptionEnvelope = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "cart_id": cart_id })),
            )
            .await?;
        Ok(envelope.shipping_option)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::MedusaConfig;
    use crate::medusa::ShippingPriceType;

    use super::*;

    fn client_for(server: &MockServer) -> MedusaClient {
        MedusaClient::new(&MedusaConfig::new(&server.uri(), "pk_test")).unwrap()
    }

    fn cart_json(id: &str, quantity: u32) -> serde_json::Value {
        json!({
            "cart": {
                "id": id,
                "currency_code": "inr",
                "items": [{"id": "item_1", "title": "S", "quantity": quantity, "unit_price": 999}],
                "total": 999 * quantity
            }
        })
    }

    #[tokio::test]
    async fn test_create_cart_in_region() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts"))
            .and(body_json(json!({"region_id": "reg_1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cart": {"id": "cart_1", "items": null}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cart = client.create_cart(&RegionId::new("reg_1")).await.unwrap();
        assert_eq!(cart.id.as_str(), "cart_1");
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_get_cart_requests_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/carts/cart_1"))
            .and(query_param("fields", CART_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("cart_1", 2)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cart = client.get_cart(&CartId::new("cart_1")).await.unwrap();
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_line_item_mutations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/line-items"))
            .and(body_json(json!({"variant_id": "variant_1", "quantity": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("cart_1", 1)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/line-items/item_1"))
            .and(body_json(json!({"quantity": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("cart_1", 3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/store/carts/cart_1/line-items/item_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "item_1",
                "object": "line-item",
                "deleted": true,
                "parent": {"id": "cart_1", "items": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cart_id = CartId::new("cart_1");
        let line_id = LineItemId::new("item_1");

        let cart = client
            .add_line_item(&cart_id, &VariantId::new("variant_1"), 1)
            .await
            .unwrap();
        assert_eq!(cart.item_count(), 1);

        let cart = client.update_line_item(&cart_id, &line_id, 3).await.unwrap();
        assert_eq!(cart.item_count(), 3);

        let cart = client.delete_line_item(&cart_id, &line_id).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_apply_promotion_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/promotions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "invalid_data",
                "message": "The promotion code SAVE99 is invalid"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .apply_promotions(&CartId::new("cart_1"), &["SAVE99"])
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "The promotion code SAVE99 is invalid");
    }

    #[tokio::test]
    async fn test_transfer_cart_uses_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/customer"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("cart_1", 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .transfer_cart(&CartId::new("cart_1"), &CustomerToken::new("tok"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_complete_cart_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/complete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "order",
                "order": {"id": "order_1", "display_id": 12, "total": 1998}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client.complete_cart(&CartId::new("cart_1")).await.unwrap();
        match outcome {
            CompleteCartOutcome::Order(order) => {
                assert_eq!(order.display_id, Some(12));
                assert_eq!(order.total, Some(Decimal::from(1998)));
            }
            CompleteCartOutcome::Cart { .. } => panic!("expected order"),
        }
    }

    #[tokio::test]
    async fn test_shipping_options_and_calculation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/shipping-options"))
            .and(query_param("cart_id", "cart_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shipping_options": [
                    {"id": "so_flat", "name": "Standard", "price_type": "flat", "amount": 99},
                    {"id": "so_calc", "name": "Express", "price_type": "calculated"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/shipping-options/so_calc/calculate"))
            .and(body_json(json!({"cart_id": "cart_1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shipping_option": {"id": "so_calc", "name": "Express", "price_type": "calculated", "amount": 249}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cart_id = CartId::new("cart_1");
        let options = client.list_shipping_options(&cart_id).await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].price_type, ShippingPriceType::Calculated);
        assert!(options[1].amount.is_none());

        let priced = client
            .calculate_shipping_option(&options[1].id, &cart_id)
            .await
            .unwrap();
        assert_eq!(priced.amount, Some(Decimal::from(249)));
    }
}

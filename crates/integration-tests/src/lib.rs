//! Integration test harness for the dbk storefront.
//!
//! Each test gets its own storefront, served on an ephemeral port, wired
//! to a [`wiremock`] server standing in for the Medusa backend. Tests mount
//! the backend responses they need and drive the storefront over HTTP with
//! a cookie-keeping client, the way a browser would.
//!
//! # Test Categories
//!
//! - `health`: liveness and readiness probes
//! - `catalog`: product pages and not-found handling
//! - `listing`: collection pages and "Load more"
//! - `cart`: adding lines, promotions, the drawer fragment and the count badge
//! - `checkout`: empty carts, rejected and placed orders
//! - `account`: sign-in, profile and sign-out
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dbk-integration-tests
//! ```
//!
//! No external services are needed.

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;

use reqwest::{Client, redirect::Policy};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dbk_storefront::config::StorefrontConfig;
use dbk_storefront::state::AppState;

/// Publishable key the storefront is configured with.
pub const PUBLISHABLE_KEY: &str = "pk_test_storefront";

/// A running storefront and the mock backend behind it.
pub struct TestStorefront {
    pub backend: MockServer,
    pub client: Client,
    base_url: String,
}

impl TestStorefront {
    /// Start a mock backend and a storefront pointing at it.
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let backend_url = backend.uri();

        let lookup = move |key: &str| match key {
            "MEDUSA_BACKEND_URL" => Some(backend_url.clone()),
            "MEDUSA_PUBLISHABLE_KEY" => Some(PUBLISHABLE_KEY.to_string()),
            "STOREFRONT_PORT" => Some("0".to_string()),
            _ => None,
        };
        let config = StorefrontConfig::from_lookup(&lookup).expect("test configuration");
        let state = AppState::new(config).expect("test state");
        let app = dbk_storefront::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        // Redirects are asserted on, not followed
        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("test client");

        Self {
            backend,
            client,
            base_url: format!("http://{addr}"),
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a storefront page.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("storefront request")
    }

    /// GET a storefront fragment the way HTMX does.
    pub async fn get_htmx(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .expect("storefront request")
    }

    /// POST a form to the storefront.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("storefront request")
    }

    /// POST a form the way HTMX does.
    pub async fn post_form_htmx(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("storefront request")
    }

    /// Answer `verb route` on the backend with `body`.
    pub async fn mock_json(&self, verb: &str, route: &str, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.backend)
            .await;
    }

    /// Answer `verb route` on the backend with an error status.
    pub async fn mock_error(&self, verb: &str, route: &str, status: u16, message: &str) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "type": "error", "message": message })),
            )
            .mount(&self.backend)
            .await;
    }

    /// Mount the single India region every visitor lands in.
    pub async fn mock_region(&self) {
        self.mock_json("GET", "/store/regions", json!({ "regions": [region()] }))
            .await;
        self.mock_json("GET", "/store/regions/reg_in", json!({ "region": region() }))
            .await;
    }
}

/// Location header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Backend fixtures
// =============================================================================

/// The India region.
#[must_use]
pub fn region() -> Value {
    json!({
        "id": "reg_in",
        "name": "India",
        "currency_code": "inr",
        "countries": [{ "iso_2": "in", "display_name": "India" }]
    })
}

/// A linen shirt in two sizes, priced in rupees.
#[must_use]
pub fn product() -> Value {
    let price = json!({
        "calculated_amount": 1499,
        "calculated_amount_with_tax": 1499,
        "original_amount": 1999,
        "original_amount_with_tax": 1999,
        "currency_code": "inr",
        "calculated_price": { "price_list_type": "sale" }
    });
    json!({
        "id": "prod_linen",
        "title": "Linen Shirt",
        "handle": "linen-shirt",
        "description": "Breathable everyday linen.",
        "thumbnail": "https://cdn.example.com/linen.jpg",
        "images": [{ "id": "img_1", "url": "https://cdn.example.com/linen.jpg" }],
        "options": [{
            "id": "opt_size",
            "title": "Size",
            "values": [{ "value": "M" }, { "value": "L" }]
        }],
        "variants": [
            {
                "id": "variant_m",
                "title": "M",
                "options": [{ "value": "M", "option_id": "opt_size" }],
                "calculated_price": price
            },
            {
                "id": "variant_l",
                "title": "L",
                "options": [{ "value": "L", "option_id": "opt_size" }],
                "calculated_price": price
            }
        ],
        "categories": []
    })
}

/// An empty cart in the India region.
#[must_use]
pub fn empty_cart() -> Value {
    json!({
        "id": "cart_1",
        "region_id": "reg_in",
        "region": region(),
        "currency_code": "inr",
        "items": [],
        "shipping_methods": [],
        "promotions": [],
        "subtotal": 0,
        "total": 0
    })
}

/// A cart holding two linen shirts.
#[must_use]
pub fn cart_with_shirt() -> Value {
    let mut cart = empty_cart();
    cart["items"] = json!([{
        "id": "item_1",
        "title": "Linen Shirt",
        "product_title": "Linen Shirt",
        "product_handle": "linen-shirt",
        "variant_title": "M",
        "variant_id": "variant_m",
        "thumbnail": "https://cdn.example.com/linen.jpg",
        "quantity": 2,
        "unit_price": 1499,
        "subtotal": 2998,
        "total": 2998
    }]);
    cart["subtotal"] = json!(2998);
    cart["item_subtotal"] = json!(2998);
    cart["total"] = json!(2998);
    cart
}

/// [`cart_with_shirt`] with contact, address and shipping filled in.
#[must_use]
pub fn ready_cart() -> Value {
    let mut cart = cart_with_shirt();
    let address = json!({
        "first_name": "Asha",
        "last_name": "Rao",
        "address_1": "12 MG Road",
        "city": "Bengaluru",
        "postal_code": "560001",
        "country_code": "in",
        "phone": "9845000000"
    });
    cart["email"] = json!("asha@example.com");
    cart["shipping_address"] = address.clone();
    cart["billing_address"] = address;
    cart["shipping_methods"] = json!([{
        "id": "sm_1",
        "shipping_option_id": "so_standard",
        "name": "Standard",
        "amount": 0
    }]);
    cart
}

/// The signed-in customer.
#[must_use]
pub fn customer() -> Value {
    json!({
        "id": "cus_asha",
        "email": "asha@example.com",
        "first_name": "Asha",
        "last_name": "Rao",
        "phone": "9845000000",
        "addresses": []
    })
}

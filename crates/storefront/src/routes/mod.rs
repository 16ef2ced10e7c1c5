//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                             - Home page
//! GET  /banners                      - Banner carousel fragment (HTMX)
//! GET  /categories                   - Categories row fragment (HTMX)
//! GET  /health, /health/ready        - Health checks
//!
//! # Catalog
//! GET  /collections/{handle}         - Collection listing
//! GET  /categories/{handle}          - Category listing
//! GET  /search?q=                    - Search results
//! GET  /product/{handle}             - Product detail
//! GET  /product/{handle}/purchase    - Price + variant selector fragment (HTMX)
//! GET  /product/{id}/reviews         - Reviews fragment (HTMX)
//! POST /product/{id}/reviews         - Submit a review
//!
//! # Cart
//! GET  /cart                         - Cart page
//! GET  /cart/drawer                  - Cart drawer fragment (HTMX)
//! POST /cart/add                     - Add a line
//! POST /cart/update                  - Change a line's quantity
//! POST /cart/remove                  - Remove a line
//! GET  /cart/count                   - Cart count badge (fragment)
//! POST /cart/promotions              - Apply a promo code
//! POST /cart/promotions/remove       - Remove a promo code
//!
//! # Checkout
//! GET  /checkout/confirm             - Contact, address, shipping, summary
//! POST /checkout/contact             - Set the email
//! POST /checkout/address             - Type in an address
//! POST /checkout/address/saved       - Pick a saved address
//! POST /checkout/address/new         - Save a new address and pick it
//! POST /checkout/shipping            - Pick a shipping method
//! POST /checkout/complete            - Place the order
//! GET  /order/success?id=            - Order confirmation
//!
//! # Account
//! GET  /profile                      - Sign-in form or profile
//! POST /profile                      - Update profile
//! POST /profile/addresses            - Add an address
//! POST /profile/addresses/{id}       - Update an address
//! POST /profile/addresses/{id}/delete - Delete an address
//!
//! # Auth (rate limited)
//! POST /auth/login, /auth/register, /auth/logout
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod collections;
pub mod health;
pub mod home;
pub mod products;
pub mod reviews;
pub mod search;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use dbk_core::pagination::MAX_PAGES;

use crate::filters;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// `?page=N` on "Load more" listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    /// 1-based page, clamped to `1..=MAX_PAGES`.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGES)
    }
}

/// `?error=` / `?success=` flash messages carried through a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// Redirect to `path` with a flash message in the query string.
#[must_use]
pub fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{key}={}",
        urlencoding::encode(message)
    ))
}

/// Page shown when the requested item does not exist.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
    pub nonce: String,
}

/// A 404 page with `message`.
#[must_use]
pub fn not_found(message: &str, nonce: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            message: message.to_string(),
            nonce,
        },
    )
        .into_response()
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/collections/{handle}", get(collections::collection))
        .route("/categories/{handle}", get(collections::category))
        .route("/search", get(search::search))
        .route("/product/{handle}", get(products::show))
        .route("/product/{handle}/purchase", get(products::purchase))
        .route(
            "/product/{handle}/reviews",
            get(reviews::list).post(reviews::submit),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/drawer", get(cart::drawer))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .route("/promotions", post(cart::apply_promotion))
        .route("/promotions/remove", post(cart::remove_promotion))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/confirm", get(checkout::confirm))
        .route("/contact", post(checkout::contact))
        .route("/address", post(checkout::address))
        .route("/address/saved", post(checkout::saved_address))
        .route("/address/new", post(checkout::new_address))
        .route("/shipping", post(checkout::shipping))
        .route("/complete", post(checkout::complete))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::show).post(account::update_profile))
        .route("/addresses", post(account::add_address))
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
}

/// Create the auth routes router, rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/banners", get(home::banners))
        .route("/categories", get(home::categories))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/order/success", get(checkout::order_success))
        .nest("/profile", account_routes())
        .nest("/auth", auth_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_to_one() {
        assert_eq!(PageQuery::default().page(), 1);
        assert_eq!(PageQuery { page: Some(0) }.page(), 1);
        assert_eq!(PageQuery { page: Some(3) }.page(), 3);
    }

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("hx-request", axum::http::HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        let response = redirect_with("/profile", "error", "Please fill all fields.").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/profile?error=Please%20fill%20all%20fields.")
        );

        let response = redirect_with("/profile?register=1", "error", "x").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/profile?register=1&error=x")
        );
    }
}

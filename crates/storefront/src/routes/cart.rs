//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! HTMX requests get the drawer fragment back with an `HX-Trigger` so the
//! count badge refreshes; plain form posts are redirected to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::{LineItemId, VariantId};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{Cart, LineItem, MedusaClient};
use crate::middleware::CspNonce;
use crate::services::CartProvider;
use crate::state::AppState;

use super::collections::item_count_label;
use super::{MessageQuery, is_htmx, redirect_with};

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub title: String,
    pub href: Option<String>,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    /// Quantity the minus button sets; never below one.
    pub decrement_to: u32,
    pub increment_to: u32,
    pub unit_price: String,
    pub total: String,
}

impl CartLineView {
    fn new(item: &LineItem, cart: &Cart, client: &MedusaClient) -> Self {
        let total = item.total.or(item.subtotal).or_else(|| {
            item.unit_price
                .map(|price| price * rust_decimal::Decimal::from(item.quantity))
        });
        Self {
            id: item.id.to_string(),
            title: item
                .product_title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| item.title.clone()),
            href: item
                .product_handle
                .as_deref()
                .filter(|h| !h.is_empty())
                .map(|h| format!("/product/{h}")),
            variant_title: item.variant_title.clone().filter(|t| !t.is_empty()),
            thumbnail: item.thumbnail.as_deref().and_then(|url| client.media_url(url)),
            quantity: item.quantity,
            decrement_to: item.quantity.saturating_sub(1).max(1),
            increment_to: item.quantity.saturating_add(1),
            unit_price: cart.money(item.unit_price).format(),
            total: cart.money(total).format(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub promotions: Vec<String>,
    pub total: String,
    /// Struck-through total before discounts, when higher.
    pub original_total: Option<String>,
    pub item_count: u32,
    pub item_count_label: String,
    pub error: Option<String>,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            promotions: Vec::new(),
            total: String::new(),
            original_total: None,
            item_count: 0,
            item_count_label: item_count_label(0),
            error: None,
        }
    }

    #[must_use]
    pub fn new(cart: &Cart, client: &MedusaClient) -> Self {
        let original_total = match (cart.original_total, cart.total) {
            (Some(original), Some(total)) if original > total => {
                Some(cart.money(Some(original)).format())
            }
            _ => None,
        };
        let item_count = cart.item_count();

        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartLineView::new(item, cart, client))
                .collect(),
            promotions: cart
                .promotions
                .iter()
                .filter_map(|p| p.code.clone())
                .collect(),
            total: cart.money(cart.total).format(),
            original_total,
            item_count,
            item_count_label: item_count_label(u64::from(item_count)),
            error: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}

/// The visitor's cart as a view, empty when there is none or it fails to load.
async fn current_view(state: &AppState, session: &Session) -> CartView {
    match CartProvider::new(session, state.medusa()).peek().await {
        Ok(Some(cart)) => CartView::new(&cart, state.medusa()),
        Ok(None) => CartView::empty(),
        Err(e) => {
            tracing::warn!("Failed to fetch cart: {e}");
            CartView::empty()
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: VariantId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: LineItemId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: LineItemId,
}

/// Promo code form data.
#[derive(Debug, Deserialize)]
pub struct PromotionForm {
    #[serde(default)]
    pub code: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub nonce: String,
}

/// Cart drawer fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_drawer.html")]
pub struct CartDrawerTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Answer a cart mutation.
///
/// HTMX gets the drawer (with the error shown inline on failure); plain
/// requests are redirected to the cart page.
async fn mutation_response(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    result: Result<Cart, AppError>,
) -> Response {
    let htmx = is_htmx(headers);
    match result {
        Ok(cart) if htmx => (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartDrawerTemplate {
                cart: CartView::new(&cart, state.medusa()),
            },
        )
            .into_response(),
        Ok(_) => Redirect::to("/cart").into_response(),
        Err(e) => {
            tracing::error!("Cart update failed: {e}");
            let message = e.user_message();
            if htmx {
                CartDrawerTemplate {
                    cart: current_view(state, session).await.with_error(Some(message)),
                }
                .into_response()
            } else {
                redirect_with("/cart", "error", &message).into_response()
            }
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    CartShowTemplate {
        cart: current_view(&state, &session).await.with_error(query.error),
        nonce,
    }
}

/// Cart drawer contents (HTMX).
#[instrument(skip(state, session))]
pub async fn drawer(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    CartDrawerTemplate {
        cart: current_view(&state, &session).await,
    }
}

/// Add item to cart, creating the cart if needed.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let result = CartProvider::new(&session, state.medusa())
        .add_line(&form.variant_id, form.quantity.unwrap_or(1))
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Update cart item quantity.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let result = CartProvider::new(&session, state.medusa())
        .update_line(&form.line_id, form.quantity)
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Remove item from cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let result = CartProvider::new(&session, state.medusa())
        .remove_line(&form.line_id)
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Apply a promo code.
#[instrument(skip(state, session, headers))]
pub async fn apply_promotion(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<PromotionForm>,
) -> Response {
    let result = CartProvider::new(&session, state.medusa())
        .apply_promotion(&form.code)
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Remove a promo code.
#[instrument(skip(state, session, headers))]
pub async fn remove_promotion(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<PromotionForm>,
) -> Response {
    let result = CartProvider::new(&session, state.medusa())
        .remove_promotion(&form.code)
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let count = match CartProvider::new(&session, state.medusa()).peek().await {
        Ok(cart) => cart.map_or(0, |c| c.item_count()),
        Err(e) => {
            tracing::warn!("Failed to fetch cart for count: {e}");
            0
        }
    };

    CartCountTemplate { count }
}

//! Product route handlers and the product views shared by listings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use dbk_core::RegionId;
use dbk_core::pricing::PricePoint;
use dbk_core::variant::{OptionSelection, resolve};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{MedusaClient, MedusaError, Product, ProductOption};
use crate::middleware::CspNonce;
use crate::services::RegionProvider;
use crate::state::AppState;

use super::not_found;

/// Query prefix carrying one selected option value: `opt.<option_id>=<value>`.
const OPTION_PREFIX: &str = "opt.";

// =============================================================================
// Views
// =============================================================================

/// Price display data for templates.
#[derive(Clone)]
pub struct PriceView {
    pub price: String,
    pub compare_at: Option<String>,
    pub percent_off: Option<u32>,
}

impl PriceView {
    /// Card rendering: `₹1,299`.
    #[must_use]
    pub fn compact(point: &PricePoint) -> Self {
        Self {
            price: point.price().format_compact(),
            compare_at: point.compare_at_price().map(|m| m.format_compact()),
            percent_off: point.percent_off(),
        }
    }

    /// Price block rendering: `₹1,299.00`.
    #[must_use]
    pub fn full(point: &PricePoint) -> Self {
        Self {
            price: point.price().format(),
            compare_at: point.compare_at_price().map(|m| m.format()),
            percent_off: point.percent_off(),
        }
    }
}

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub href: String,
    pub title: String,
    pub image: Option<String>,
    /// Remaining images, cycled on hover.
    pub hover_images: Vec<String>,
    pub price: Option<PriceView>,
    pub video_url: Option<String>,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, client: &MedusaClient) -> Self {
        let mut images = product
            .image_urls()
            .into_iter()
            .filter_map(|url| client.media_url(url));
        let image = images.next();

        Self {
            href: format!("/product/{}", product.slug()),
            title: product.title.clone(),
            image,
            hover_images: images.collect(),
            price: product.lowest_price().as_ref().map(PriceView::compact),
            video_url: product.video_url().and_then(|url| client.media_url(url)),
        }
    }

    #[must_use]
    pub fn list(products: &[Product], client: &MedusaClient) -> Vec<Self> {
        products.iter().map(|p| Self::new(p, client)).collect()
    }
}

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    /// HTML as authored in the backend.
    pub description: Option<String>,
    pub images: Vec<String>,
    pub video_url: Option<String>,
}

impl ProductDetailView {
    #[must_use]
    pub fn new(product: &Product, client: &MedusaClient) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            category: product.primary_category().map(|c| c.name.clone()),
            description: product
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            images: product
                .image_urls()
                .into_iter()
                .filter_map(|url| client.media_url(url))
                .collect(),
            video_url: product.video_url().and_then(|url| client.media_url(url)),
        }
    }
}

/// One selectable option value.
#[derive(Clone)]
pub struct OptionValueView {
    pub value: String,
    pub selected: bool,
    /// Query string selecting this value on top of the current selection.
    pub query: String,
}

/// One option dimension (size, colour).
#[derive(Clone)]
pub struct OptionView {
    pub title: String,
    pub values: Vec<OptionValueView>,
}

impl OptionView {
    fn new(option: &ProductOption, selection: &OptionSelection) -> Self {
        Self {
            title: option.title.clone(),
            values: option
                .values
                .iter()
                .map(|v| OptionValueView {
                    value: v.value.clone(),
                    selected: selection.is_selected(&option.id, &v.value),
                    query: selection_query(&selection.with(&option.id, &v.value)),
                })
                .collect(),
        }
    }
}

/// Price block, variant selector and add-to-cart state.
#[derive(Clone)]
pub struct PurchaseView {
    pub slug: String,
    pub price: Option<PriceView>,
    pub options: Vec<OptionView>,
    /// Resolved variant; add-to-cart stays disabled without one.
    pub variant_id: Option<String>,
}

impl PurchaseView {
    #[must_use]
    pub fn new(product: &Product, selection: &OptionSelection) -> Self {
        let option_ids = product.option_ids();
        let selection = &selection.restricted_to(&option_ids);
        let variant = resolve(selection, &option_ids, &product.variants);
        let priced = variant.or_else(|| product.variants.first());

        Self {
            slug: product.slug().to_string(),
            price: priced
                .and_then(|v| v.price_point())
                .as_ref()
                .map(PriceView::full),
            options: product
                .options
                .iter()
                .map(|o| OptionView::new(o, selection))
                .collect(),
            variant_id: variant.map(|v| v.id.to_string()),
        }
    }
}

/// Selected option values from `opt.<option_id>=<value>` query pairs.
#[must_use]
pub fn parse_selection(pairs: &[(String, String)]) -> OptionSelection {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(OPTION_PREFIX)
                .filter(|id| !id.is_empty())
                .map(|id| (id, value.as_str()))
        })
        .collect()
}

/// Encode a selection back into `opt.<option_id>=<value>` pairs.
#[must_use]
pub fn selection_query(selection: &OptionSelection) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (id, value) in selection.iter() {
        query.append_pair(&format!("{OPTION_PREFIX}{id}"), value);
    }
    query.finish()
}

// =============================================================================
// Templates
// =============================================================================

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductDetailView,
    pub purchase: PurchaseView,
    pub related_products: Vec<ProductCardView>,
    pub nonce: String,
}

/// Purchase fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/purchase.html")]
pub struct PurchaseTemplate {
    pub purchase: PurchaseView,
}

// =============================================================================
// Handlers
// =============================================================================

async fn load_product(
    state: &AppState,
    region_id: Option<&RegionId>,
    handle: &str,
) -> Result<Option<Product>, AppError> {
    match state.medusa().get_product_by_handle(handle, region_id).await {
        Ok(product) => Ok(Some(product)),
        Err(MedusaError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Display product detail page.
#[instrument(skip(state, session, nonce, query))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(handle): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let region_id = RegionProvider::new(&session, state.medusa())
        .current_id()
        .await?;
    let Some(product) = load_product(&state, region_id.as_ref(), &handle).await? else {
        return Ok(not_found("Product not found.", nonce));
    };

    let related = state
        .medusa()
        .related_products(&product, region_id.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(product_id = %product.id, error = %e, "Failed to load related products");
            Vec::new()
        });

    let selection = parse_selection(&query);
    Ok(ProductShowTemplate {
        product: ProductDetailView::new(&product, state.medusa()),
        purchase: PurchaseView::new(&product, &selection),
        related_products: ProductCardView::list(&related, state.medusa()),
        nonce,
    }
    .into_response())
}

/// Price block + selector + add-to-cart for a new selection (HTMX).
#[instrument(skip(state, session, nonce, query))]
pub async fn purchase(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(handle): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let region_id = RegionProvider::new(&session, state.medusa())
        .current_id()
        .await?;
    let Some(product) = load_product(&state, region_id.as_ref(), &handle).await? else {
        return Ok(not_found("Product not found.", nonce));
    };

    Ok(PurchaseTemplate {
        purchase: PurchaseView::new(&product, &parse_selection(&query)),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::config::MedusaConfig;

    use super::*;

    fn product() -> Product {
        serde_json::from_value(json!({
            "id": "prod_1",
            "title": "Linen Kurta",
            "handle": "linen-kurta",
            "thumbnail": "/static/kurta.jpg",
            "images": [{"url": "/static/kurta.jpg"}, {"url": "https://cdn.example.com/kurta-back.jpg"}],
            "options": [
                {"id": "opt_size", "title": "Size", "values": [{"value": "M"}, {"value": "L"}]}
            ],
            "variants": [
                {
                    "id": "var_m",
                    "options": [{"option_id": "opt_size", "value": "M"}],
                    "calculated_price": {
                        "calculated_amount": 900,
                        "original_amount": 1200,
                        "currency_code": "inr",
                        "calculated_price": {"price_list_type": "sale"}
                    }
                },
                {
                    "id": "var_l",
                    "options": [{"option_id": "opt_size", "value": "L"}],
                    "calculated_price": {"calculated_amount": 1000, "currency_code": "inr"}
                }
            ],
            "metadata": {"video_url": "/static/kurta.mp4"}
        }))
        .unwrap()
    }

    fn client() -> MedusaClient {
        MedusaClient::new(&MedusaConfig::new("http://localhost:9000", "pk_test")).unwrap()
    }

    #[test]
    fn test_card_uses_absolute_urls_and_lowest_price() {
        let card = ProductCardView::new(&product(), &client());
        assert_eq!(card.href, "/product/linen-kurta");
        assert_eq!(
            card.image.as_deref(),
            Some("http://localhost:9000/static/kurta.jpg")
        );
        assert_eq!(card.hover_images, vec!["https://cdn.example.com/kurta-back.jpg"]);
        assert_eq!(
            card.video_url.as_deref(),
            Some("http://localhost:9000/static/kurta.mp4")
        );

        let price = card.price.unwrap();
        assert_eq!(price.price, "₹900");
        assert_eq!(price.compare_at.as_deref(), Some("₹1,200"));
        assert_eq!(price.percent_off, Some(25));
    }

    #[test]
    fn test_purchase_without_selection_prices_first_variant() {
        let view = PurchaseView::new(&product(), &OptionSelection::new());
        assert!(view.variant_id.is_none());
        assert_eq!(view.price.unwrap().price, "₹900.00");
        assert!(view.options[0].values.iter().all(|v| !v.selected));
    }

    #[test]
    fn test_purchase_resolves_selected_variant() {
        let selection = parse_selection(&[("opt.opt_size".to_string(), "L".to_string())]);
        let view = PurchaseView::new(&product(), &selection);
        assert_eq!(view.variant_id.as_deref(), Some("var_l"));

        let price = view.price.unwrap();
        assert_eq!(price.price, "₹1,000.00");
        assert!(price.compare_at.is_none());
        assert!(view.options[0].values[1].selected);
    }

    #[test]
    fn test_selection_round_trips_through_query() {
        let selection = parse_selection(&[
            ("opt.opt_size".to_string(), "M & L".to_string()),
            ("utm_source".to_string(), "mail".to_string()),
        ]);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection_query(&selection), "opt.opt_size=M+%26+L");
    }

    #[test]
    fn test_stale_option_in_link_still_resolves_variant() {
        let selection = parse_selection(&[
            ("opt.opt_old".to_string(), "x".to_string()),
            ("opt.opt_size".to_string(), "M".to_string()),
        ]);
        let view = PurchaseView::new(&product(), &selection);
        assert_eq!(view.variant_id.as_deref(), Some("var_m"));
        assert!(
            view.options[0]
                .values
                .iter()
                .all(|v| !v.query.contains("opt_old"))
        );
    }
}

//! Collection and category listing handlers.
//!
//! Listings show pages `1..=page` at once. "Load more" links to the next
//! page number and HTMX swaps the grown grid in place.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::pagination::{Accumulator, following_page};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{MedusaClient, MedusaError, Product, ProductQuery};
use crate::middleware::CspNonce;
use crate::services::RegionProvider;
use crate::state::AppState;

use super::products::ProductCardView;
use super::{PageQuery, not_found};

/// Product grid display data for templates.
#[derive(Clone)]
pub struct ListingView {
    pub title: String,
    /// Line under the title, e.g. "3 items".
    pub subtitle: Option<String>,
    pub products: Vec<ProductCardView>,
    /// URL of the next page while more products exist.
    pub load_more_href: Option<String>,
}

impl ListingView {
    /// Build from accumulated pages. `base_href` is the listing URL with any
    /// query but without `page`.
    #[must_use]
    pub fn new(
        title: String,
        subtitle: Option<String>,
        accumulated: &Accumulator<Product>,
        base_href: &str,
        page: u32,
        client: &MedusaClient,
    ) -> Self {
        let separator = if base_href.contains('?') { '&' } else { '?' };
        Self {
            title,
            subtitle,
            products: ProductCardView::list(accumulated.items(), client),
            load_more_href: accumulated
                .has_more()
                .then(|| following_page(page))
                .flatten()
                .map(|next| format!("{base_href}{separator}page={next}")),
        }
    }
}

/// "1 item" / "N items".
#[must_use]
pub fn item_count_label(count: u64) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

/// Fetch pages `1..=page` of `query`, de-duplicated by product id.
///
/// # Errors
///
/// Returns the first failed page's error.
pub async fn accumulate_products(
    client: &MedusaClient,
    query: &ProductQuery,
    page: u32,
) -> Result<Accumulator<Product>, MedusaError> {
    let mut accumulated = Accumulator::new();
    for current in 1..=page {
        let result = client.list_products(&query.clone().page(current)).await?;
        accumulated.set_total(result.count);
        let last = result.products.is_empty();
        accumulated.extend(result.products);
        if last {
            break;
        }
    }
    Ok(accumulated)
}

/// Listing page template, shared by collections, categories and search.
#[derive(Template, WebTemplate)]
#[template(path = "collections/show.html")]
pub struct ListingTemplate {
    pub listing: ListingView,
    /// Search box value.
    pub query: String,
    pub nonce: String,
}

/// Display a collection's products.
#[instrument(skip(state, session, nonce))]
pub async fn collection(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(handle): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let client = state.medusa();
    let collection = match client.get_collection_by_handle(&handle).await {
        Ok(collection) => collection,
        Err(MedusaError::NotFound(_)) => return Ok(not_found("Collection not found.", nonce)),
        Err(e) => return Err(e.into()),
    };

    let region_id = RegionProvider::new(&session, client).current_id().await?;
    let page = query.page();
    let products = ProductQuery::listing(region_id).in_collection(collection.id);
    let accumulated = accumulate_products(client, &products, page).await?;

    Ok(ListingTemplate {
        listing: ListingView::new(
            collection.title,
            Some(item_count_label(accumulated.total())),
            &accumulated,
            &format!("/collections/{}", urlencoding::encode(&handle)),
            page,
            client,
        ),
        query: String::new(),
        nonce,
    }
    .into_response())
}

/// Display a product category's products.
#[instrument(skip(state, session, nonce))]
pub async fn category(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(handle): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let client = state.medusa();
    let category = match client.get_category_by_handle(&handle).await {
        Ok(category) => category,
        Err(MedusaError::NotFound(_)) => return Ok(not_found("Category not found.", nonce)),
        Err(e) => return Err(e.into()),
    };

    let region_id = RegionProvider::new(&session, client).current_id().await?;
    let page = query.page();
    let products = ProductQuery::listing(region_id).in_category(category.id);
    let accumulated = accumulate_products(client, &products, page).await?;

    Ok(ListingTemplate {
        listing: ListingView::new(
            category.name,
            Some(item_count_label(accumulated.total())),
            &accumulated,
            &format!("/categories/{}", urlencoding::encode(&handle)),
            page,
            client,
        ),
        query: String::new(),
        nonce,
    }
    .into_response())
}

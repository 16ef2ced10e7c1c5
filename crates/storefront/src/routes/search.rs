//! Product search handler.

use axum::extract::{Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::medusa::ProductQuery;
use crate::middleware::CspNonce;
use crate::services::RegionProvider;
use crate::state::AppState;

use super::collections::{ListingTemplate, ListingView, accumulate_products, item_count_label};

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

/// Heading line for a search.
///
/// ```text
/// Showing results for “kurta” — 3 items
/// ```
#[must_use]
pub fn results_heading(q: &str, count: u64) -> String {
    if q.is_empty() {
        return "All products".to_string();
    }
    if count == 0 {
        format!("Showing results for “{q}”")
    } else {
        format!("Showing results for “{q}” — {}", item_count_label(count))
    }
}

/// Display search results; an empty query lists all products.
#[instrument(skip(state, session, nonce))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<ListingTemplate, AppError> {
    let client = state.medusa();
    let q = query.q.trim();
    let page = query.page.unwrap_or(1).max(1);

    let region_id = RegionProvider::new(&session, client).current_id().await?;
    let mut products = ProductQuery::listing(region_id);
    if !q.is_empty() {
        products = products.matching(q);
    }
    let accumulated = accumulate_products(client, &products, page).await?;

    let base_href = if q.is_empty() {
        "/search".to_string()
    } else {
        format!("/search?q={}", urlencoding::encode(q))
    };

    Ok(ListingTemplate {
        listing: ListingView::new(
            results_heading(q, accumulated.total()),
            None,
            &accumulated,
            &base_href,
            page,
            client,
        ),
        query: q.to_string(),
        nonce,
    })
}

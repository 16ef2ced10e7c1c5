//! Home page route handlers.
//!
//! The banner carousel and the categories row are also served on their own
//! so HTMX can advance slides and load more categories in place.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::RegionId;
use dbk_core::carousel::Carousel;
use dbk_core::pagination::{Accumulator, next_page, page_count};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{
    Banner, CATEGORY_PAGE_SIZE, CategoryQuery, MedusaClient, MedusaError, ProductCategory,
    ProductQuery,
};
use crate::middleware::CspNonce;
use crate::services::RegionProvider;
use crate::state::AppState;

use super::PageQuery;
use super::products::ProductCardView;

/// Collection handles backing the home page rails.
const TRENDING_NOW_COLLECTION: &str = "trending-now";
const TOP_PICKS_COLLECTION: &str = "top-picks";
const TRENDING_VIDEOS_COLLECTION: &str = "trending-videos";

/// Milliseconds between automatic slide changes.
pub const BANNER_INTERVAL_MS: u32 = 3500;

// =============================================================================
// Banner Carousel
// =============================================================================

/// One banner slide.
#[derive(Clone)]
pub struct BannerSlideView {
    pub image_url: String,
    pub alt: String,
    pub href: String,
    pub visible: bool,
}

/// Carousel display data for templates.
#[derive(Clone)]
pub struct BannerCarouselView {
    pub slides: Vec<BannerSlideView>,
    pub index: usize,
    pub next_index: usize,
    pub previous_index: usize,
    pub can_cycle: bool,
    pub interval_ms: u32,
    pub error: Option<String>,
}

impl BannerCarouselView {
    #[must_use]
    pub fn new(banners: &[Banner], carousel: Carousel, client: &MedusaClient) -> Self {
        let slides = banners
            .iter()
            .enumerate()
            .filter_map(|(i, banner)| {
                Some(BannerSlideView {
                    image_url: client.media_url(&banner.image_url)?,
                    alt: banner
                        .alt
                        .clone()
                        .filter(|alt| !alt.trim().is_empty())
                        .unwrap_or_else(|| format!("Banner for {}", banner.collection_handle)),
                    href: format!("/collections/{}", banner.collection_handle),
                    visible: i == carousel.index(),
                })
            })
            .collect();

        Self {
            slides,
            index: carousel.index(),
            next_index: carousel.next_index(),
            previous_index: carousel.previous_index(),
            can_cycle: carousel.can_cycle(),
            interval_ms: BANNER_INTERVAL_MS,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: &MedusaError) -> Self {
        Self {
            slides: Vec::new(),
            index: 0,
            next_index: 0,
            previous_index: 0,
            can_cycle: false,
            interval_ms: BANNER_INTERVAL_MS,
            error: Some(error.user_message()),
        }
    }
}

/// Carousel movement requested by a control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarouselAction {
    #[default]
    Goto,
    Next,
    Prev,
}

/// `?index=N&action=next|prev|goto`.
#[derive(Debug, Default, Deserialize)]
pub struct BannerQuery {
    pub index: Option<usize>,
    pub action: Option<CarouselAction>,
}

impl BannerQuery {
    /// Position after applying the action to `index`, wrapped to `len`.
    #[must_use]
    pub fn carousel(&self, len: usize) -> Carousel {
        let mut carousel = Carousel::new(len, self.index.unwrap_or(0));
        match self.action.unwrap_or_default() {
            CarouselAction::Goto => {}
            CarouselAction::Next => carousel.advance(),
            CarouselAction::Prev => carousel.previous(),
        }
        carousel
    }
}

async fn banner_carousel(client: &MedusaClient, query: &BannerQuery) -> BannerCarouselView {
    match client.list_banners(None).await {
        Ok(banners) => BannerCarouselView::new(&banners, query.carousel(banners.len()), client),
        Err(e) => {
            tracing::error!("Failed to fetch banners: {e}");
            BannerCarouselView::failed(&e)
        }
    }
}

// =============================================================================
// Categories Row
// =============================================================================

/// Category link display data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub name: String,
    pub href: String,
}

impl From<&ProductCategory> for CategoryView {
    fn from(category: &ProductCategory) -> Self {
        let slug = if category.handle.is_empty() {
            category.id.as_str()
        } else {
            category.handle.as_str()
        };
        Self {
            name: category.name.clone(),
            href: format!("/categories/{slug}"),
        }
    }
}

/// Categories row display data for templates.
#[derive(Clone)]
pub struct CategoriesRowView {
    pub categories: Vec<CategoryView>,
    pub next_page: Option<u32>,
    pub error: Option<String>,
}

/// Categories pages `1..=page`, accumulated without duplicates.
async fn categories_row(client: &MedusaClient, page: u32) -> CategoriesRowView {
    let mut accumulated = Accumulator::<ProductCategory>::new();
    let mut total = 0;
    let mut exhausted = false;

    for current in 1..=page {
        match client.list_categories(&CategoryQuery::page(current)).await {
            Ok(result) => {
                total = result.count;
                exhausted = result.product_categories.is_empty();
                accumulated.extend(result.product_categories);
                if exhausted || current >= page_count(total, CATEGORY_PAGE_SIZE) {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to fetch categories page {current}: {e}");
                return CategoriesRowView {
                    categories: accumulated.items().iter().map(CategoryView::from).collect(),
                    next_page: None,
                    error: Some(e.user_message()),
                };
            }
        }
    }

    CategoriesRowView {
        categories: accumulated.items().iter().map(CategoryView::from).collect(),
        next_page: if exhausted {
            None
        } else {
            next_page(total, CATEGORY_PAGE_SIZE, page)
        },
        error: None,
    }
}

// =============================================================================
// Product Rails
// =============================================================================

/// Products of the collection `handle`; empty when it does not exist.
async fn collection_rail(
    client: &MedusaClient,
    handle: &str,
    region_id: Option<&RegionId>,
) -> Vec<ProductCardView> {
    let collection = match client.get_collection_by_handle(handle).await {
        Ok(collection) => collection,
        Err(MedusaError::NotFound(_)) => {
            tracing::debug!(handle, "Home rail collection is missing");
            return Vec::new();
        }
        Err(e) => {
            tracing::error!("Failed to fetch collection {handle}: {e}");
            return Vec::new();
        }
    };

    let query = ProductQuery::listing(region_id.cloned()).in_collection(collection.id);
    client.list_products(&query).await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch products of {handle}: {e}");
            Vec::new()
        },
        |page| ProductCardView::list(&page.products, client),
    )
}

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub banners: BannerCarouselView,
    /// Cards that carry a video; the section is hidden when empty.
    pub videos: Vec<ProductCardView>,
    pub trending_now: Vec<ProductCardView>,
    pub top_picks: Vec<ProductCardView>,
    pub categories: CategoriesRowView,
    pub nonce: String,
}

/// Banner carousel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/banner_carousel.html")]
pub struct BannerCarouselTemplate {
    pub banners: BannerCarouselView,
}

/// Categories row fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/categories_row.html")]
pub struct CategoriesRowTemplate {
    pub categories: CategoriesRowView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the home page.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<HomeTemplate, AppError> {
    let region_id = RegionProvider::new(&session, state.medusa())
        .current_id()
        .await?;
    let client = state.medusa();
    let banner_query = BannerQuery::default();

    let (banners, videos, trending_now, top_picks, categories) = tokio::join!(
        banner_carousel(client, &banner_query),
        collection_rail(client, TRENDING_VIDEOS_COLLECTION, region_id.as_ref()),
        collection_rail(client, TRENDING_NOW_COLLECTION, region_id.as_ref()),
        collection_rail(client, TOP_PICKS_COLLECTION, region_id.as_ref()),
        categories_row(client, 1),
    );

    Ok(HomeTemplate {
        banners,
        videos: videos
            .into_iter()
            .filter(|card| card.video_url.is_some())
            .collect(),
        trending_now,
        top_picks,
        categories,
        nonce,
    })
}

/// Banner carousel at a new position (HTMX).
#[instrument(skip(state))]
pub async fn banners(
    State(state): State<AppState>,
    Query(query): Query<BannerQuery>,
) -> BannerCarouselTemplate {
    BannerCarouselTemplate {
        banners: banner_carousel(state.medusa(), &query).await,
    }
}

/// Categories row with `page` pages loaded (HTMX).
#[instrument(skip(state))]
pub async fn categories(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> CategoriesRowTemplate {
    CategoriesRowTemplate {
        categories: categories_row(state.medusa(), query.page()).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::config::MedusaConfig;

    use super::*;

    fn banners() -> Vec<Banner> {
        serde_json::from_value(json!([
            {"id": "b1", "image_url": "/static/b1.jpg", "alt": "Festive drops", "collection_handle": "festive"},
            {"id": "b2", "image_url": "https://cdn.example.com/b2.jpg", "collection_handle": "linen"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_banner_query_wraps() {
        let query = BannerQuery {
            index: Some(1),
            action: Some(CarouselAction::Next),
        };
        assert_eq!(query.carousel(2).index(), 0);

        let query = BannerQuery {
            index: Some(0),
            action: Some(CarouselAction::Prev),
        };
        assert_eq!(query.carousel(3).index(), 2);

        let query = BannerQuery {
            index: Some(7),
            action: None,
        };
        assert_eq!(query.carousel(3).index(), 1);
    }

    #[test]
    fn test_banner_view_defaults_alt_and_links_collection() {
        let client =
            MedusaClient::new(&MedusaConfig::new("http://localhost:9000", "pk_test")).unwrap();
        let view = BannerCarouselView::new(&banners(), Carousel::new(2, 1), &client);

        assert!(view.can_cycle);
        assert_eq!(view.next_index, 0);
        let second = view.slides.get(1).unwrap();
        assert_eq!(second.alt, "Banner for linen");
        assert_eq!(second.href, "/collections/linen");
        assert!(second.visible);
        assert_eq!(
            view.slides.first().unwrap().image_url,
            "http://localhost:9000/static/b1.jpg"
        );
    }

    #[test]
    fn test_category_link_prefers_handle() {
        let category: ProductCategory =
            serde_json::from_value(json!({"id": "pcat_1", "name": "Sarees", "handle": "sarees"}))
                .unwrap();
        assert_eq!(CategoryView::from(&category).href, "/categories/sarees");
    }
}

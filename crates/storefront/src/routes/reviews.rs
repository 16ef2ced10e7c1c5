//! Product review handlers.
//!
//! The reviews section is an HTMX fragment loaded by the product page. It
//! accumulates pages like the product listings do.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::ProductId;
use dbk_core::address::filled;
use dbk_core::pagination::{Accumulator, next_page, page_count};
use dbk_core::rating::{is_valid_rating, rating_label, round_average, star_fills};

use crate::error::AppError;
use crate::medusa::{Customer, MedusaClient, REVIEW_PAGE_SIZE, Review, ReviewInput};
use crate::middleware::OptionalCustomer;
use crate::services::{CustomerProvider, CustomerState};
use crate::state::AppState;

use super::PageQuery;

const SIGN_IN_REQUIRED: &str = "You need to sign in to write a review.";
const MISSING_FIELDS: &str = "Please provide a rating and content.";
const SUBMITTED: &str = "Thanks! Your review was submitted and awaits approval.";
const SUBMIT_FAILED: &str = "Could not submit review. Are you logged in?";

/// Star widget display data: the filled width of each star out of 24.
#[derive(Clone)]
pub struct StarsView {
    pub widths: Vec<String>,
    pub label: String,
}

impl StarsView {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            widths: star_fills(value)
                .iter()
                .map(|fill| format!("{:.1}", fill * 24.0))
                .collect(),
            label: rating_label(value),
        }
    }
}

/// Review display data for templates.
#[derive(Clone)]
pub struct ReviewView {
    pub title: Option<String>,
    pub content: String,
    pub author: String,
    pub stars: StarsView,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            title: review.title.clone().filter(|t| !t.trim().is_empty()),
            content: review.content.clone(),
            author: [review.first_name.as_deref(), review.last_name.as_deref()]
                .into_iter()
                .filter_map(filled)
                .collect::<Vec<_>>()
                .join(" "),
            stars: StarsView::new(review.rating),
        }
    }
}

/// A status line under the review form.
#[derive(Clone)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

/// Reviews section template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/reviews.html")]
pub struct ReviewsTemplate {
    pub product_id: String,
    pub average: StarsView,
    pub count: u64,
    pub reviews: Vec<ReviewView>,
    pub next_page: Option<u32>,
    pub signed_in: bool,
    pub notice: Option<Notice>,
}

/// Review form data.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Empty until a star is picked.
    #[serde(default)]
    pub rating: String,
}

impl ReviewForm {
    /// The review to submit, or `None` when the rating or content is missing.
    #[must_use]
    pub fn to_input(&self, product_id: ProductId, customer: &Customer) -> Option<ReviewInput> {
        let rating = self.rating.trim().parse::<u8>().ok().filter(|r| is_valid_rating(*r))?;
        let content = filled(Some(&self.content))?;

        Some(ReviewInput {
            product_id,
            title: filled(Some(&self.title)).map(str::to_string),
            content: content.to_string(),
            rating,
            first_name: customer.first_name.clone().unwrap_or_default(),
            last_name: customer.last_name.clone().unwrap_or_default(),
        })
    }
}

async fn reviews_section(
    client: &MedusaClient,
    product_id: &ProductId,
    page: u32,
    signed_in: bool,
    notice: Option<Notice>,
) -> Result<ReviewsTemplate, AppError> {
    let mut accumulated = Accumulator::<Review>::new();
    let mut average = 0.0;
    let mut count = 0;
    let mut limit = REVIEW_PAGE_SIZE;
    let mut exhausted = false;

    for current in 1..=page {
        let result = client
            .list_product_reviews(product_id, current, REVIEW_PAGE_SIZE)
            .await?;
        average = result.average_rating;
        count = result.count;
        if result.limit > 0 {
            limit = result.limit;
        }
        exhausted = result.reviews.is_empty();
        accumulated.extend(result.reviews);
        if exhausted || current >= page_count(count, limit) {
            break;
        }
    }

    Ok(ReviewsTemplate {
        product_id: product_id.to_string(),
        average: StarsView::new(f64::from(round_average(average))),
        count,
        reviews: accumulated.items().iter().map(ReviewView::from).collect(),
        next_page: if exhausted { None } else { next_page(count, limit, page) },
        signed_in,
        notice,
    })
}

/// Reviews section with pages `1..=page` (HTMX).
#[instrument(skip(state, customer))]
pub async fn list(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    Path(product_id): Path<ProductId>,
    Query(query): Query<PageQuery>,
) -> Result<ReviewsTemplate, AppError> {
    reviews_section(
        state.medusa(),
        &product_id,
        query.page(),
        customer.is_authenticated(),
        None,
    )
    .await
}

/// Submit a review for a signed-in customer (HTMX).
#[instrument(skip(state, session, customer, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Path(product_id): Path<ProductId>,
    Form(form): Form<ReviewForm>,
) -> Result<ReviewsTemplate, AppError> {
    let notice = match &customer {
        CustomerState::Authenticated(customer) => {
            submit_for(&state, &session, &product_id, &form, customer).await?
        }
        CustomerState::Anonymous | CustomerState::Failed(_) => Notice {
            message: SIGN_IN_REQUIRED.to_string(),
            is_error: true,
        },
    };

    reviews_section(
        state.medusa(),
        &product_id,
        1,
        customer.is_authenticated(),
        Some(notice),
    )
    .await
}

async fn submit_for(
    state: &AppState,
    session: &Session,
    product_id: &ProductId,
    form: &ReviewForm,
    customer: &Customer,
) -> Result<Notice, AppError> {
    let Some(input) = form.to_input(product_id.clone(), customer) else {
        return Ok(Notice {
            message: MISSING_FIELDS.to_string(),
            is_error: true,
        });
    };
    let Some(token) = CustomerProvider::new(session, state.medusa()).token().await? else {
        return Ok(Notice {
            message: SIGN_IN_REQUIRED.to_string(),
            is_error: true,
        });
    };

    Ok(match state.medusa().submit_review(&token, &input).await {
        Ok(()) => {
            tracing::info!(product_id = %product_id, "Review submitted");
            Notice {
                message: SUBMITTED.to_string(),
                is_error: false,
            }
        }
        Err(e) => {
            tracing::warn!(product_id = %product_id, error = %e, "Review submission failed");
            Notice {
                message: SUBMIT_FAILED.to_string(),
                is_error: true,
            }
        }
    })
}

//! Customer extractors.
//!
//! The customer is loaded from the backend on every request that asks for
//! it, using the token stored in the session.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::medusa::{Customer, CustomerToken};
use crate::services::{CustomerProvider, CustomerState};
use crate::state::AppState;

/// Where signed-out visitors are sent to sign in.
pub const LOGIN_PATH: &str = "/profile";

fn session(parts: &Parts) -> Result<Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))
}

/// The visitor, signed in or not.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalCustomer(state): OptionalCustomer) -> impl IntoResponse {
///     match state.customer() {
///         Some(c) => format!("Hello, {}!", c.email),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalCustomer(pub CustomerState);

impl FromRequestParts<AppState> for OptionalCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;
        let customer = CustomerProvider::new(&session, state.medusa())
            .current()
            .await?;
        Ok(Self(customer))
    }
}

/// A signed-in customer and their token.
///
/// Signed-out visitors are redirected to the sign-in form.
pub struct RequireCustomer {
    pub customer: Box<Customer>,
    pub token: CustomerToken,
}

/// Why [`RequireCustomer`] refused the request.
#[derive(Debug)]
pub enum CustomerRejection {
    RedirectToLogin,
    Failed(AppError),
}

impl IntoResponse for CustomerRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Failed(e) => e.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = CustomerRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session(parts).map_err(CustomerRejection::Failed)?;
        let provider = CustomerProvider::new(&session, state.medusa());

        let customer = match provider.current().await.map_err(CustomerRejection::Failed)? {
            CustomerState::Authenticated(customer) => customer,
            CustomerState::Anonymous | CustomerState::Failed(_) => {
                return Err(CustomerRejection::RedirectToLogin);
            }
        };
        let token = provider
            .token()
            .await
            .map_err(CustomerRejection::Failed)?
            .ok_or(CustomerRejection::RedirectToLogin)?;

        Ok(Self { customer, token })
    }
}

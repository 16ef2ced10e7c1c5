//! Authentication route handlers.
//!
//! The sign-in and registration forms live on `/profile`; these handlers
//! only process them and redirect back with a flash message.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::middleware::LOGIN_PATH;
use crate::services::{AuthService, Registration};
use crate::state::AppState;

use super::redirect_with;

const REGISTER_PATH: &str = "/profile?register=1";

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    pub password: SecretString,
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(&session, state.medusa())
        .login(&form.email, form.password.expose_secret())
        .await
    {
        Ok(()) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            redirect_with(LOGIN_PATH, "error", &e.user_message()).into_response()
        }
    }
}

/// Handle registration form submission; the new customer is signed in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Registration>,
) -> Response {
    match AuthService::new(&session, state.medusa())
        .register(&form)
        .await
    {
        Ok(()) => redirect_with(LOGIN_PATH, "success", "Account created.").into_response(),
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            redirect_with(REGISTER_PATH, "error", &e.user_message()).into_response()
        }
    }
}

/// Sign out. The cart is kept.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = AuthService::new(&session, state.medusa()).logout().await {
        tracing::error!("Logout failed: {e}");
        return redirect_with(LOGIN_PATH, "error", &e.user_message()).into_response();
    }
    Redirect::to(LOGIN_PATH).into_response()
}

//! Authentication error types.

use thiserror::Error;

use crate::error::AppError;
use crate::medusa::MedusaError;

/// Errors that can occur during sign-in and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field was left blank.
    #[error("missing fields")]
    MissingFields,

    /// The email does not look like an address.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] dbk_core::EmailError),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The identity existed, but attaching a customer to it failed.
    #[error("registration incomplete: {0}")]
    RegistrationIncomplete(#[source] MedusaError),

    /// Creating the identity or the customer failed.
    #[error("account creation failed: {0}")]
    AccountCreation(#[source] MedusaError),

    /// Backend rejected the credentials or failed.
    #[error("backend error: {0}")]
    Medusa(#[from] MedusaError),

    /// Session read or write failed.
    #[error("session error: {0}")]
    Session(#[from] AppError),
}

impl AuthError {
    /// Text shown under the form.
    ///
    /// Backend messages are passed through where the backend explains the
    /// problem (bad credentials, duplicate identity); anything else falls
    /// back to a fixed line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingFields => "Please fill all fields.".to_string(),
            Self::InvalidEmail(e) => format!("Please check your email: {e}."),
            Self::PasswordMismatch => "Passwords do not match.".to_string(),
            Self::RegistrationIncomplete(e) => {
                backend_message(e).unwrap_or_else(|| "Could not complete registration".to_string())
            }
            Self::AccountCreation(e) => {
                backend_message(e).unwrap_or_else(|| "Could not create account.".to_string())
            }
            Self::Medusa(MedusaError::UnsupportedAuthFlow) => {
                "Requires extra auth steps not supported in this flow.".to_string()
            }
            Self::Medusa(e) => backend_message(e).unwrap_or_else(|| "Login failed".to_string()),
            Self::Session(e) => e.user_message(),
        }
    }
}

/// The backend's own explanation, when it sent one worth showing.
fn backend_message(error: &MedusaError) -> Option<String> {
    match error {
        MedusaError::Unauthorized(message) | MedusaError::Api { message, .. }
            if !message.is_empty() && !error_is_server_side(error) =>
        {
            Some(message.clone())
        }
        MedusaError::UnsupportedAuthFlow => Some(error.user_message()),
        _ => None,
    }
}

const fn error_is_server_side(error: &MedusaError) -> bool {
    matches!(error, MedusaError::Api { status, .. } if *status >= 500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(AuthError::MissingFields.user_message(), "Please fill all fields.");
        assert_eq!(AuthError::PasswordMismatch.user_message(), "Passwords do not match.");
    }

    #[test]
    fn test_backend_messages_pass_through() {
        let err = AuthError::Medusa(MedusaError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
        assert_eq!(err.user_message(), "Invalid email or password");

        let err = AuthError::Medusa(MedusaError::UnsupportedAuthFlow);
        assert_eq!(
            err.user_message(),
            "Requires extra auth steps not supported in this flow."
        );
    }

    #[test]
    fn test_server_errors_use_fallbacks() {
        let err = AuthError::AccountCreation(MedusaError::Api {
            status: 500,
            message: "db down".to_string(),
        });
        assert_eq!(err.user_message(), "Could not create account.");

        let err = AuthError::RegistrationIncomplete(MedusaError::Unauthorized(String::new()));
        assert_eq!(err.user_message(), "Could not complete registration");

        let err = AuthError::Medusa(MedusaError::RateLimited(5));
        assert_eq!(err.user_message(), "Login failed");
    }
}

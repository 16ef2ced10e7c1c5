//! Authentication service.
//!
//! Email/password accounts live in the commerce backend. Signing in stores
//! the backend's bearer token in the session and hands the guest cart over
//! to the customer.

mod error;

pub use error::AuthError;

use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::Email;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::medusa::{CustomerCreate, CustomerToken, MedusaClient, MedusaError};

use super::cart::CartProvider;
use super::customer::CustomerProvider;

/// Backend message for a registration whose email already has an identity.
const IDENTITY_EXISTS: &str = "Identity with email already exists";

/// Sign-up form input.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: SecretString,
    #[serde(default)]
    pub confirm_password: SecretString,
}

impl Registration {
    /// Check the form before anything reaches the backend.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields`, `PasswordMismatch` or `InvalidEmail`.
    pub fn validate(&self) -> Result<Email, AuthError> {
        let password = self.password.expose_secret();
        let blank = [&self.first_name, &self.last_name, &self.email]
            .into_iter()
            .any(|field| field.trim().is_empty());
        if blank || password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }
        if password != self.confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        Ok(Email::parse(&self.email)?)
    }

    fn customer(&self, email: &Email) -> CustomerCreate {
        CustomerCreate {
            email: email.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        }
    }
}

/// Authentication service.
///
/// Handles login, registration and logout for one visitor's session.
pub struct AuthService<'a> {
    session: &'a Session,
    client: &'a MedusaClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(session: &'a Session, client: &'a MedusaClient) -> Self {
        Self { session, client }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` for blank input, `Medusa` when the backend
    /// rejects the credentials or asks for a redirect flow.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let email = Email::parse(email)?;

        let token = self.client.login(email.as_str(), password).await?;
        self.finish(&token).await
    }

    /// Create an account and sign in.
    ///
    /// The backend issues a registration token that may only create the
    /// customer record; a real session token comes from logging in after.
    /// If the identity already exists (an earlier attempt stopped half way),
    /// the password is used to log in and attach the missing customer.
    ///
    /// # Errors
    ///
    /// Returns validation errors, `RegistrationIncomplete` when recovering an
    /// existing identity fails, or `AccountCreation` otherwise.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<(), AuthError> {
        let email = form.validate()?;
        let customer = form.customer(&email);

        let password = form.password.expose_secret();
        let created = match self.client.register(email.as_str(), password).await {
            Ok(registration) => self.client.create_customer(&registration, &customer).await,
            Err(MedusaError::Unauthorized(message)) if message == IDENTITY_EXISTS => {
                tracing::info!("Identity exists, attaching customer");
                return self.recover_existing(&email, password, &customer).await;
            }
            Err(e) => return Err(AuthError::AccountCreation(e)),
        };
        created.map_err(AuthError::AccountCreation)?;

        let token = self
            .client
            .login(email.as_str(), password)
            .await
            .map_err(AuthError::AccountCreation)?;
        self.finish(&token).await
    }

    async fn recover_existing(
        &self,
        email: &Email,
        password: &str,
        customer: &CustomerCreate,
    ) -> Result<(), AuthError> {
        let token = self
            .client
            .login(email.as_str(), password)
            .await
            .map_err(AuthError::RegistrationIncomplete)?;
        self.client
            .create_customer(&token, customer)
            .await
            .map_err(AuthError::RegistrationIncomplete)?;

        // the first token predates the customer record
        let token = self
            .client
            .login(email.as_str(), password)
            .await
            .map_err(AuthError::RegistrationIncomplete)?;
        self.finish(&token).await
    }

    /// Store the token, transfer the cart and tag error reports.
    async fn finish(&self, token: &CustomerToken) -> Result<(), AuthError> {
        CustomerProvider::new(self.session, self.client)
            .store_token(token)
            .await?;
        CartProvider::new(self.session, self.client)
            .transfer_to_customer(token)
            .await;

        if let Ok(customer) = self.client.get_customer(token).await {
            set_sentry_user(&customer.id, Some(&customer.email));
            tracing::info!(customer_id = %customer.id, "Customer signed in");
        }
        Ok(())
    }

    /// Sign out. The cart stays with the visitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        CustomerProvider::new(self.session, self.client)
            .clear_token()
            .await?;
        clear_sentry_user();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> Registration {
        Registration {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            password: "pw-123456".into(),
            confirm_password: "pw-123456".into(),
        }
    }

    #[test]
    fn test_registration_requires_every_field() {
        let mut blank = form();
        blank.last_name = "  ".into();
        assert!(matches!(blank.validate(), Err(AuthError::MissingFields)));
    }

    #[test]
    fn test_registration_requires_matching_passwords() {
        let mut mismatch = form();
        mismatch.confirm_password = "other".into();
        assert!(matches!(mismatch.validate(), Err(AuthError::PasswordMismatch)));
    }

    #[test]
    fn test_registration_rejects_malformed_email() {
        let mut bad = form();
        bad.email = "asha@".into();
        assert!(matches!(bad.validate(), Err(AuthError::InvalidEmail(_))));
    }

    #[test]
    fn test_valid_registration_builds_customer() {
        let mut form = form();
        form.email = " asha@example.com ".into();
        let email = form.validate().unwrap();
        let customer = form.customer(&email);
        assert_eq!(customer.email, "asha@example.com");
        assert_eq!(customer.first_name, "Asha");
    }

    #[test]
    fn test_registration_debug_hides_passwords() {
        let rendered = format!("{:?}", form());
        assert!(rendered.contains("asha@example.com"));
        assert!(!rendered.contains("pw-123456"));
    }
}

//! Customer accounts and email/password authentication.

use std::fmt;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;
use tracing::instrument;

use dbk_core::CustomerAddressId;
use dbk_core::address::DraftAddress;

use super::MedusaError;
use super::client::MedusaClient;
use super::types::{Customer, CustomerCreate, CustomerEnvelope, CustomerUpdate, ParentEnvelope};

const CUSTOMER_FIELDS: &str = "*addresses";

/// Bearer token issued by the backend's auth module.
///
/// Serializes as a plain string so it can live in the session store, but
/// never prints.
pub struct CustomerToken(SecretString);

impl CustomerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for CustomerToken {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for CustomerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomerToken([REDACTED])")
    }
}

impl Serialize for CustomerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for CustomerToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Login and registration answer with either a token or, for third-party
/// providers, a location to redirect to.
#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl AuthResponse {
    fn into_token(self) -> Result<CustomerToken, MedusaError> {
        match (self.token, self.location) {
            (Some(token), _) if !token.is_empty() => Ok(CustomerToken::new(token)),
            (_, Some(_)) => Err(MedusaError::UnsupportedAuthFlow),
            _ => Err(MedusaError::Api {
                status: 200,
                message: "Login failed".to_string(),
            }),
        }
    }
}

impl MedusaClient {
    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for bad credentials, `UnsupportedAuthFlow` when
    /// the backend wants a redirect, or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CustomerToken, MedusaError> {
        let url = self.endpoint(&["auth", "customer", "emailpass"])?;
        let response: AuthResponse = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        response.into_token()
    }

    /// Register an email/password identity.
    ///
    /// The returned token only authorizes creating the customer record.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized("Identity with email already exists")` when the
    /// identity exists, or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CustomerToken, MedusaError> {
        let url = self.endpoint(&["auth", "customer", "emailpass", "register"])?;
        let response: AuthResponse = self
            .execute(
                self.request(Method::POST, url, None)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        response.into_token()
    }

    // =========================================================================
    // Customer Methods
    // =========================================================================

    /// The signed-in customer with their address book.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the token is missing or expired, or an
    /// error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn get_customer(&self, token: &CustomerToken) -> Result<Customer, MedusaError> {
        let mut url = self.endpoint(&["store", "customers", "me"])?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);
        let envelope: CustomerEnvelope = self
            .execute(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(envelope.customer)
    }

    /// Create the customer record for a freshly registered identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(email = %input.email))]
    pub async fn create_customer(
        &self,
        token: &CustomerToken,
        input: &CustomerCreate,
    ) -> Result<Customer, MedusaError> {
        let url = self.endpoint(&["store", "customers"])?;
        let envelope: CustomerEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(input))
            .await?;
        Ok(envelope.customer)
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input))]
    pub async fn update_customer(
        &self,
        token: &CustomerToken,
        input: &CustomerUpdate,
    ) -> Result<Customer, MedusaError> {
        let mut url = self.endpoint(&["store", "customers", "me"])?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);
        let envelope: CustomerEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(input))
            .await?;
        Ok(envelope.customer)
    }

    /// Add an address to the address book.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address))]
    pub async fn add_customer_address(
        &self,
        token: &CustomerToken,
        address: &DraftAddress,
    ) -> Result<Customer, MedusaError> {
        let mut url = self.endpoint(&["store", "customers", "me", "addresses"])?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);
        let envelope: CustomerEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(address))
            .await?;
        Ok(envelope.customer)
    }

    /// Replace fields of a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address), fields(address_id = %id))]
    pub async fn update_customer_address(
        &self,
        token: &CustomerToken,
        id: &CustomerAddressId,
        address: &DraftAddress,
    ) -> Result<Customer, MedusaError> {
        let mut url = self.endpoint(&["store", "customers", "me", "addresses", id.as_str()])?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);
        let envelope: CustomerEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(address))
            .await?;
        Ok(envelope.customer)
    }

    /// Delete a saved address. The backend answers with the parent customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn delete_customer_address(
        &self,
        token: &CustomerToken,
        id: &CustomerAddressId,
    ) -> Result<Customer, MedusaError> {
        let mut url = self.endpoint(&["store", "customers", "me", "addresses", id.as_str()])?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);
        let envelope: ParentEnvelope<Customer> = self
            .execute(self.request(Method::DELETE, url, Some(token)))
            .await?;
        Ok(envelope.parent)
    }
}

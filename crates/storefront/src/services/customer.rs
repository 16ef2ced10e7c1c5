//! The signed-in customer.
//!
//! The session holds the backend bearer token. The customer record itself is
//! fetched per request and never cached.

use tower_sessions::Session;
use tracing::instrument;

use dbk_core::CustomerAddressId;
use dbk_core::address::{DraftAddress, filled, resolve_country_code};

use crate::error::AppError;
use crate::medusa::{Customer, CustomerToken, CustomerUpdate, MedusaClient, MedusaError, Region};
use crate::models::session::keys;

/// Who is looking at the page.
#[derive(Debug, Clone)]
pub enum CustomerState {
    Anonymous,
    Authenticated(Box<Customer>),
    /// A token is stored but the customer could not be loaded.
    Failed(String),
}

impl CustomerState {
    #[must_use]
    pub fn customer(&self) -> Option<&Customer> {
        match self {
            Self::Authenticated(customer) => Some(customer),
            Self::Anonymous | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::Anonymous | Self::Authenticated(_) => None,
        }
    }
}

/// Session-scoped customer operations.
pub struct CustomerProvider<'a> {
    session: &'a Session,
    client: &'a MedusaClient,
}

impl<'a> CustomerProvider<'a> {
    #[must_use]
    pub const fn new(session: &'a Session, client: &'a MedusaClient) -> Self {
        Self { session, client }
    }

    /// The stored bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn token(&self) -> Result<Option<CustomerToken>, AppError> {
        Ok(self.session.get::<CustomerToken>(keys::CUSTOMER_TOKEN).await?)
    }

    /// Remember a freshly issued token.
    ///
    /// The session id is cycled first so a pre-login id cannot be reused.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn store_token(&self, token: &CustomerToken) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session.insert(keys::CUSTOMER_TOKEN, token).await?;
        Ok(())
    }

    /// Forget the token. Cart and region stay with the visitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn clear_token(&self) -> Result<(), AppError> {
        self.session
            .remove::<CustomerToken>(keys::CUSTOMER_TOKEN)
            .await?;
        Ok(())
    }

    async fn require_token(&self) -> Result<CustomerToken, AppError> {
        self.token()
            .await?
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }

    /// Load the customer behind the stored token.
    ///
    /// An expired or revoked token is dropped and reads as anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails; backend failures
    /// become [`CustomerState::Failed`].
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<CustomerState, AppError> {
        let Some(token) = self.token().await? else {
            return Ok(CustomerState::Anonymous);
        };

        match self.client.get_customer(&token).await {
            Ok(customer) => Ok(CustomerState::Authenticated(Box::new(customer))),
            Err(MedusaError::Unauthorized(_)) => {
                tracing::info!("Customer token rejected, signing out");
                self.clear_token().await?;
                Ok(CustomerState::Anonymous)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load customer");
                Ok(CustomerState::Failed("Failed to load customer".to_string()))
            }
        }
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or an error if the backend
    /// rejects the change.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &CustomerUpdate) -> Result<Customer, AppError> {
        let token = self.require_token().await?;
        Ok(self.client.update_customer(&token, update).await?)
    }

    /// Add an address to the address book.
    ///
    /// The country field may hold a display name or an ISO code; it is
    /// resolved against the region's countries.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or an error if the backend
    /// rejects the address.
    #[instrument(skip(self, address, region))]
    pub async fn add_address(
        &self,
        address: DraftAddress,
        region: Option<&Region>,
    ) -> Result<Customer, AppError> {
        let token = self.require_token().await?;
        let address = normalize_country(address, region);
        Ok(self.client.add_customer_address(&token, &address).await?)
    }

    /// Replace fields of a saved address.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or an error if the backend
    /// rejects the change.
    #[instrument(skip(self, address, region), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        id: &CustomerAddressId,
        address: DraftAddress,
        region: Option<&Region>,
    ) -> Result<Customer, AppError> {
        let token = self.require_token().await?;
        let address = normalize_country(address, region);
        Ok(self
            .client
            .update_customer_address(&token, id, &address)
            .await?)
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or an error if the backend
    /// fails.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: &CustomerAddressId) -> Result<Customer, AppError> {
        let token = self.require_token().await?;
        Ok(self.client.delete_customer_address(&token, id).await?)
    }
}

/// Resolve free-text country input to an ISO code the backend accepts.
fn normalize_country(mut address: DraftAddress, region: Option<&Region>) -> DraftAddress {
    let countries = region.map(Region::country_refs).unwrap_or_default();
    let input = filled(address.country_code.as_deref()).unwrap_or_default();
    address.country_code = Some(resolve_country_code(input, &countries));
    address
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn region() -> Region {
        serde_json::from_value(serde_json::json!({
            "id": "reg_1",
            "name": "Asia",
            "currency_code": "inr",
            "countries": [
                {"iso_2": "in", "display_name": "India"},
                {"iso_2": "lk", "display_name": "Sri Lanka"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_country_resolves_by_display_name() {
        let address = DraftAddress {
            country_code: Some("sri lanka".into()),
            ..DraftAddress::default()
        };
        let region = region();
        let address = normalize_country(address, Some(&region));
        assert_eq!(address.country_code.as_deref(), Some("lk"));
    }

    #[test]
    fn test_unknown_country_falls_back_to_region_then_default() {
        let region = region();
        let address = normalize_country(DraftAddress::default(), Some(&region));
        assert_eq!(address.country_code.as_deref(), Some("in"));

        let address = DraftAddress {
            country_code: Some("Atlantis".into()),
            ..DraftAddress::default()
        };
        let address = normalize_country(address, None);
        assert_eq!(address.country_code.as_deref(), Some("in"));
    }

    #[test]
    fn test_state_accessors() {
        assert!(!CustomerState::Anonymous.is_authenticated());
        let failed = CustomerState::Failed("Failed to load customer".to_string());
        assert_eq!(failed.error(), Some("Failed to load customer"));
        assert!(failed.customer().is_none());
    }
}

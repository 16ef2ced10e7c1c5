//! Application state shared across handlers.

use std::sync::Arc;

use dbk_core::CartId;

use crate::config::StorefrontConfig;
use crate::medusa::{Cart, MedusaClient, MedusaError};
use crate::services::SingleFlight;

/// Outcome of one checkout draft sync, shared by every caller that joined it.
pub type SyncResult = Result<Cart, Arc<MedusaError>>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    medusa: MedusaClient,
    checkout_sync: SingleFlight<CartId, SyncResult>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL in `config` is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, MedusaError> {
        let medusa = MedusaClient::new(&config.medusa)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                medusa,
                checkout_sync: SingleFlight::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Medusa Store API client.
    #[must_use]
    pub fn medusa(&self) -> &MedusaClient {
        &self.inner.medusa
    }

    /// Per-cart coalescing of checkout draft syncs.
    #[must_use]
    pub fn checkout_sync(&self) -> &SingleFlight<CartId, SyncResult> {
        &self.inner.checkout_sync
    }
}

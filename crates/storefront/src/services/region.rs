//! Region resolution.
//!
//! A visitor is priced in one region for the whole session: the stored region
//! when the backend still knows it, else the first region the backend lists.

use tower_sessions::Session;
use tracing::instrument;

use dbk_core::RegionId;

use crate::error::AppError;
use crate::medusa::{MedusaClient, MedusaError, Region};
use crate::models::session::keys;

/// Session-scoped region lookup.
pub struct RegionProvider<'a> {
    session: &'a Session,
    client: &'a MedusaClient,
}

impl<'a> RegionProvider<'a> {
    #[must_use]
    pub const fn new(session: &'a Session, client: &'a MedusaClient) -> Self {
        Self { session, client }
    }

    /// The visitor's region, resolving and remembering it on first use.
    ///
    /// Returns `None` when the backend has no regions at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the session store fails.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Option<Region>, AppError> {
        if let Some(id) = self.session.get::<RegionId>(keys::REGION_ID).await? {
            match self.client.get_region(&id).await {
                Ok(region) => return Ok(Some(region)),
                Err(MedusaError::NotFound(_)) => {
                    tracing::warn!(region_id = %id, "Stored region no longer exists");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(region) = self.client.list_regions().await?.into_iter().next() else {
            tracing::warn!("Backend has no regions");
            return Ok(None);
        };

        self.session.insert(keys::REGION_ID, &region.id).await?;
        Ok(Some(region))
    }

    /// Id of [`Self::current`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the session store fails.
    pub async fn current_id(&self) -> Result<Option<RegionId>, AppError> {
        Ok(self.current().await?.map(|region| region.id))
    }
}

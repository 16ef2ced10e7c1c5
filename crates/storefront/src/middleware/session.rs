//! Session middleware configuration.
//!
//! Sessions live in a bounded `moka` cache that evicts each record once its
//! expiry passes. They only hold ids and the checkout draft; the backend owns
//! everything else, so a restart costs visitors their cart link and sign-in
//! but no data.

use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "dbk_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions held at once; the least recently used go first.
const MAX_SESSIONS: u64 = 100_000;

/// Create the session store.
#[must_use]
pub fn create_session_store() -> MokaStore {
    MokaStore::new(Some(MAX_SESSIONS))
}

/// Create the session layer over `store`.
///
/// The cookie is `Secure` when the public base URL is https.
#[must_use]
pub fn create_session_layer(
    store: MokaStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_sessions::SessionStore;
    use tower_sessions::cookie::time::OffsetDateTime;
    use tower_sessions::session::{Id, Record};

    use super::*;

    fn record(expiry_date: OffsetDateTime) -> Record {
        Record {
            id: Id::default(),
            data: std::collections::HashMap::default(),
            expiry_date,
        }
    }

    #[tokio::test]
    async fn test_store_round_trips_live_session() {
        let store = create_session_store();
        let mut live = record(OffsetDateTime::now_utc() + Duration::days(7));
        store.create(&mut live).await.unwrap();

        assert_eq!(store.load(&live.id).await.unwrap(), Some(live));
    }

    #[tokio::test]
    async fn test_store_drops_expired_session() {
        let store = create_session_store();
        let mut stale = record(OffsetDateTime::now_utc() - Duration::seconds(1));
        store.create(&mut stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
    }
}

//! HTTP plumbing shared by every Store API call.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::MedusaConfig;

use super::MedusaError;
use super::cache::{CacheKey, CacheValue};
use super::customer::CustomerToken;

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// Client for the Medusa Store API.
///
/// Cheap to clone; all clones share one connection pool and one catalog
/// cache.
#[derive(Clone)]
pub struct MedusaClient {
    inner: Arc<MedusaClientInner>,
}

struct MedusaClientInner {
    client: reqwest::Client,
    base_url: Url,
    publishable_key: String,
    media_base_url: Option<String>,
    cache: Cache<CacheKey, CacheValue>,
}

/// Error body shape used by Medusa (`{"type": "...", "message": "..."}`).
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl MedusaClient {
    /// Create a new Store API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured backend URL cannot be parsed.
    pub fn new(config: &MedusaConfig) -> Result<Self, MedusaError> {
        let base_url =
            Url::parse(&config.backend_url).map_err(|e| MedusaError::Url(e.to_string()))?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(MedusaClientInner {
                client: reqwest::Client::new(),
                base_url,
                publishable_key: config.publishable_key.clone(),
                media_base_url: config.media_base_url.clone(),
                cache,
            }),
        })
    }

    /// Backend origin, without a trailing slash.
    #[must_use]
    pub fn backend_url(&self) -> &str {
        self.inner.base_url.as_str().trim_end_matches('/')
    }

    /// Rewrite a relative media path into an absolute URL.
    #[must_use]
    pub fn media_url(&self, url: &str) -> Option<String> {
        dbk_core::media::absolute_media_url(
            url,
            self.inner.media_base_url.as_deref(),
            Some(self.backend_url()),
        )
    }

    /// Drop every cached catalog response.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }

    pub(super) async fn cache_get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    pub(super) async fn cache_put(&self, key: CacheKey, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    /// Build an endpoint URL from path segments.
    ///
    /// Segments are percent-encoded, so handles and ids taken from request
    /// paths cannot escape the Store API prefix.
    pub(super) fn endpoint(&self, segments: &[&str]) -> Result<Url, MedusaError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| MedusaError::Url(format!("{} cannot be a base", self.inner.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request with the publishable key and, when given, the
    /// customer's bearer token.
    pub(super) fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&CustomerToken>,
    ) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(PUBLISHABLE_KEY_HEADER, &self.inner.publishable_key);

        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Send a request and decode a JSON response.
    pub(super) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, MedusaError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(MedusaError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text, 500),
                "Failed to parse Medusa response"
            );
            MedusaError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    pub(super) async fn execute_empty(&self, request: RequestBuilder) -> Result<(), MedusaError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let response_text = response.text().await?;
        Err(status_error(status, &response_text))
    }
}

fn status_error(status: StatusCode, body: &str) -> MedusaError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| truncate(body.trim(), 200));

    match status {
        StatusCode::UNAUTHORIZED => {
            tracing::debug!(body = %truncate(body, 200), "Medusa rejected credentials");
            MedusaError::Unauthorized(message)
        }
        StatusCode::NOT_FOUND => {
            tracing::debug!(body = %truncate(body, 200), "Medusa resource not found");
            MedusaError::NotFound(message)
        }
        _ => {
            tracing::error!(
                status = %status,
                body = %truncate(body, 500),
                "Medusa API returned non-success status"
            );
            MedusaError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> MedusaClient {
        MedusaClient::new(&MedusaConfig::new(&server.uri(), "pk_test")).unwrap()
    }

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let config = MedusaConfig::new("http://localhost:9000", "pk_test");
        let client = MedusaClient::new(&config).unwrap();
        let url = client.endpoint(&["store", "carts", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/store/carts/a%2Fb");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = MedusaConfig::new("http://localhost:9000/api", "pk_test");
        let client = MedusaClient::new(&config).unwrap();
        let url = client.endpoint(&["store", "regions"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/store/regions");
    }

    #[test]
    fn test_media_url_uses_backend_origin() {
        let config = MedusaConfig::new("http://localhost:9000", "pk_test");
        let client = MedusaClient::new(&config).unwrap();
        assert_eq!(
            client.media_url("/static/a.jpg").as_deref(),
            Some("http://localhost:9000/static/a.jpg")
        );
    }

    #[tokio::test]
    async fn test_execute_sends_publishable_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/ping"))
            .and(header(PUBLISHABLE_KEY_HEADER, "pk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.endpoint(&["store", "ping"]).unwrap();
        let pong: Pong = client
            .execute(client.request(Method::GET, url, None))
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn test_execute_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/customers/me"))
            .and(header("authorization", "Bearer tok_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let token = CustomerToken::new("tok_123");
        let url = client.endpoint(&["store", "customers", "me"]).unwrap();
        let pong: Pong = client
            .execute(client.request(Method::GET, url, Some(&token)))
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/store/unauthorized"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({"type": "unauthorized", "message": "Invalid token"}),
            ))
            .mount(&server)
            .await;
        Mock::given(path("/store/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                serde_json::json!({"type": "not_found", "message": "Cart id not found"}),
            ))
            .mount(&server)
            .await;
        Mock::given(path("/store/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(path("/store/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let call = |segment: &'static str| {
            let client = client.clone();
            async move {
                let url = client.endpoint(&["store", segment]).unwrap();
                client
                    .execute::<Pong>(client.request(Method::GET, url, None))
                    .await
                    .unwrap_err()
            }
        };

        assert!(matches!(call("unauthorized").await, MedusaError::Unauthorized(m) if m == "Invalid token"));
        assert!(matches!(call("missing").await, MedusaError::NotFound(m) if m == "Cart id not found"));
        assert!(matches!(
            call("broken").await,
            MedusaError::Api { status: 500, ref message } if message == "boom"
        ));
        assert!(matches!(call("busy").await, MedusaError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_parse_error_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(path("/store/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.endpoint(&["store", "ping"]).unwrap();
        let err = client
            .execute::<Pong>(client.request(Method::GET, url, None))
            .await
            .unwrap_err();
        assert!(matches!(err, MedusaError::Parse(_)));
    }
}

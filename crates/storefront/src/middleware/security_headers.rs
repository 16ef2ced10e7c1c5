//! Security headers middleware.
//!
//! Locked-down defaults. Scripts need the request's CSP nonce; images and
//! video may come from the commerce backend, the media host or any https
//! CDN the catalog links to.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::config::MedusaConfig;
use crate::state::AppState;

use super::csp::CspNonce;

/// Add security headers to every response.
///
/// `Cache-Control: no-store` is only set when the handler did not choose a
/// caching policy itself (static files do).
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request.extensions().get::<CspNonce>().cloned();
    let mut response = next.run(request).await;

    let policy = content_security_policy(
        nonce.as_ref().map_or("", CspNonce::value),
        &media_sources(&state.config().medusa),
    );

    let headers = response.headers_mut();
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    if let Ok(value) = HeaderValue::from_str(&policy) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=(), interest-cohort=()",
        ),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}

/// Origins of the backend and the media host, space separated.
fn media_sources(config: &MedusaConfig) -> String {
    [Some(config.backend_url.as_str()), config.media_base_url.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|raw| Url::parse(raw).ok())
        .map(|url| url.origin().ascii_serialization())
        .filter(|origin| origin != "null")
        .collect::<Vec<_>>()
        .join(" ")
}

fn content_security_policy(nonce: &str, media: &str) -> String {
    format!(
        "default-src 'self'; \
         script-src 'nonce-{nonce}' 'strict-dynamic'; \
         style-src 'self'; \
         img-src 'self' data: https: {media}; \
         media-src 'self' https: {media}; \
         font-src 'self'; \
         connect-src 'self'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

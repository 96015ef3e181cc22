//! API key gate
//!
//! The key is read from the `X-API-Key` header, falling back to the
//! `api_key` query parameter. With no configured key every request is
//! rejected. Rejected requests never reach the wrapped handler.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::error::ApiError;
use crate::state::AppState;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("no API key presented")]
    Missing,

    #[error("API key mismatch")]
    Mismatch,
}

/// Static API key policy
#[derive(Clone)]
pub struct ApiKeyGate {
    expected: Option<String>,
}

impl ApiKeyGate {
    /// Blank keys are treated as not configured.
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let expected = self.expected.as_deref().ok_or(AuthError::NotConfigured)?;
        let presented = presented.ok_or(AuthError::Missing)?;

        if constant_time_eq(expected.as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::Mismatch)
        }
    }
}

impl fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Deserialize)]
struct KeyParam {
    api_key: Option<String>,
}

/// Key presented on the request: non-empty header first, then query parameter.
pub fn presented_key(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    from_header.or_else(|| {
        Query::<KeyParam>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(param)| param.api_key)
            .filter(|v| !v.is_empty())
    })
}

/// Middleware wrapping the protected routes
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = presented_key(&request);

    match state.gate.authorize(presented.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(AuthError::NotConfigured) => {
            tracing::error!(path = %request.uri().path(), "API key not configured; rejecting request");
            ApiError::Unauthorized.into_response()
        }
        Err(reason) => {
            tracing::warn!(path = %request.uri().path(), %reason, "rejected request");
            ApiError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn gate() -> ApiKeyGate {
        ApiKeyGate::new(Some("s3cret-key".into()))
    }

    #[test]
    fn unconfigured_gate_denies_everything() {
        let gate = ApiKeyGate::new(None);
        assert_eq!(gate.authorize(None), Err(AuthError::NotConfigured));
        assert_eq!(gate.authorize(Some("")), Err(AuthError::NotConfigured));
        assert_eq!(gate.authorize(Some("anything")), Err(AuthError::NotConfigured));

        let blank = ApiKeyGate::new(Some(String::new()));
        assert!(!blank.is_configured());
        assert_eq!(blank.authorize(Some("")), Err(AuthError::NotConfigured));
    }

    #[test]
    fn exact_match_only() {
        let gate = gate();
        assert_eq!(gate.authorize(Some("s3cret-key")), Ok(()));
        assert_eq!(gate.authorize(Some("s3cret-kez")), Err(AuthError::Mismatch));
        assert_eq!(gate.authorize(Some("s3cret-key ")), Err(AuthError::Mismatch));
        assert_eq!(gate.authorize(Some("S3cret-key")), Err(AuthError::Mismatch));
        assert_eq!(gate.authorize(Some("s3cret-ke")), Err(AuthError::Mismatch));
        assert_eq!(gate.authorize(None), Err(AuthError::Missing));
    }

    #[test]
    fn compare_helper() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn debug_hides_key() {
        let shown = format!("{:?}", gate());
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("configured: true"));
    }

    fn request(uri: &str, header: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header("X-API-Key", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn header_wins_over_query() {
        let req = request("/api/objects?api_key=from-query", Some("from-header"));
        assert_eq!(presented_key(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn query_is_fallback() {
        let req = request("/api/objects?date=2024-01-01&api_key=from-query", None);
        assert_eq!(presented_key(&req).as_deref(), Some("from-query"));

        let req = request("/api/objects?api_key=from-query", Some(""));
        assert_eq!(presented_key(&req).as_deref(), Some("from-query"));
    }

    #[test]
    fn nothing_presented() {
        assert_eq!(presented_key(&request("/api/objects", None)), None);
        assert_eq!(presented_key(&request("/api/objects?api_key=", None)), None);
    }
}

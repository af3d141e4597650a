use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "key";

/// The shared secret every protected route expects, fixed at startup.
///
/// An empty key matches nothing, so all protected requests are rejected.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Constant-time comparison against a presented key.
    pub fn matches(&self, provided: &str) -> bool {
        let expected = self.0.as_bytes();
        let provided = provided.as_bytes();
        if expected.is_empty() || provided.len() != expected.len() {
            return false;
        }
        let diff = expected.iter().zip(provided).fold(0u8, |acc, (a, b)| acc | (a ^ b));
        diff == 0
    }
}

/// Rejects requests whose `Key` header does not match the configured [`ApiKey`].
pub async fn require_api_key(State(key): State<ApiKey>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|provided| key.matches(provided));

    if !authorized {
        tracing::debug!(path = %req.uri().path(), "rejected request without valid api key");
        return AppError::Unauthorized.into_response();
    }
    next.run(req).await
}

//! Error types for the marketplace cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Cloneable so that one failed fill can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The fill function returned an error; the original error is shared verbatim
    #[error("fill for '{key}' failed: {cause}")]
    Fill {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// The caller's deadline elapsed while waiting for a fill
    #[error("fill for '{key}' timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    /// The storefront slug lookup for a listing failed
    #[error("storefront lookup for listing {listing_id} failed: {cause}")]
    Resolver {
        listing_id: i64,
        cause: Arc<anyhow::Error>,
    },

    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a fill failure for the given flight key.
    pub fn fill(key: impl Into<String>, source: anyhow::Error) -> Self {
        CacheError::Fill {
            key: key.into(),
            cause: Arc::new(source),
        }
    }

    /// Returns true if two errors came from the same fill execution.
    pub fn is_same_fill(&self, other: &CacheError) -> bool {
        match (self, other) {
            (CacheError::Fill { cause: a, .. }, CacheError::Fill { cause: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Fill { .. } | CacheError::Resolver { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

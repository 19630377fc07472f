//! Error types for the offline cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::network::NetworkError;

// == Cache Error Enum ==
/// Unified error type for the offline cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in a partition
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid record, action or request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Image cannot fit in the cache even when empty
    #[error("Image {url} is {size} bytes, cache ceiling is {max} bytes")]
    ImageTooLarge { url: String, size: u64, max: u64 },

    /// The store could not be opened; the cache runs degraded
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Underlying SQLite failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Payload (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by the backend collaborator
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::Storage(_) | CacheError::Serialization(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline cache.
pub type Result<T> = std::result::Result<T, CacheError>;

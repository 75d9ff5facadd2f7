//! Error types for the cache service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::options::{OptionError, OptionField};

// == Cache Error Enum ==
/// Unified error type for every caller-facing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Operation addressed an unregistered or unavailable instance name
    #[error("Invalid cache name: {0}")]
    InvalidCacheName(String),

    /// A configuration field failed its predicate
    #[error("Invalid option: {0}")]
    InvalidOption(OptionField),

    /// Key absent, evicted, or stale with no usable refresh result
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Maps a validator failure onto the caller-facing taxonomy for `name`.
    pub fn from_option_error(err: OptionError, name: &str) -> Self {
        match err {
            OptionError::UnknownCache => CacheError::InvalidCacheName(name.to_string()),
            OptionError::InvalidField(field) => CacheError::InvalidOption(field),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidCacheName(_) | CacheError::InvalidOption(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = ErrorResponse::new(self.to_string());
        let body = match &self {
            CacheError::InvalidOption(field) => body.with_field(field.as_str()),
            CacheError::InvalidCacheName(_) => body.with_field("cache_name"),
            CacheError::NotFound(_) => body,
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;

//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for GET /caches/:name/keys/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The addressed instance
    pub cache: String,
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: String,
}

impl GetResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            cache: cache.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for PUT /caches/:name/keys/:key
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /caches/:name/keys/:key
#[derive(Debug, Clone, Serialize)]
pub struct EvictResponse {
    /// Success message
    pub message: String,
    /// The key that was evicted
    pub key: String,
}

impl EvictResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' evicted successfully", key),
            key,
        }
    }
}

/// Response body for POST /caches
#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub message: String,
    pub name: String,
}

impl StartResponse {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("Cache '{}' started", name),
            name,
        }
    }
}

/// Response body for DELETE /caches/:name
#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    pub message: String,
    pub name: String,
}

impl StopResponse {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("Cache '{}' stopped", name),
            name,
        }
    }
}

/// Response body for GET /caches
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    pub caches: Vec<String>,
}

/// Response body for GET /caches/:name/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// The addressed instance
    pub cache: String,
    /// Counter snapshot
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(cache: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            cache: cache.into(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of running cache instances
    pub caches: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(caches: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            caches,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    /// The offending field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }
}

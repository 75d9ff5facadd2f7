//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` - List running instances
//! - `POST /caches` - Start an instance
//! - `DELETE /caches/:name` - Stop an instance
//! - `GET /caches/:name/stats` - Instance statistics
//! - `GET /caches/:name/keys/:key` - Retrieve a value
//! - `PUT /caches/:name/keys/:key` - Store a value
//! - `DELETE /caches/:name/keys/:key` - Evict a value

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

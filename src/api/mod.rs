//! API Module
//!
//! HTTP handlers and routing for the cache's admin REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `DELETE /invalidate/...` - Targeted, prefix, singleton and cascading invalidation
//! - `PUT|DELETE /index/:listing_id/:slug` - Listing -> storefront index maintenance

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

//! API Routes
//!
//! Configures the Axum router with the cache's admin endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, index_listing_handler, invalidate_homepage_handler,
    invalidate_listing_handler, invalidate_pack_detail_handler, invalidate_share_token_handler,
    invalidate_storefront_handler, invalidate_user_purchased_handler, stats_handler,
    unindex_listing_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache statistics
/// - `DELETE /invalidate/storefront/:slug` - All variants of one storefront
/// - `DELETE /invalidate/pack/:token` - One pack detail
/// - `DELETE /invalidate/share-token/:token` - One share token mapping
/// - `DELETE /invalidate/user/:id` - One user's purchased set
/// - `DELETE /invalidate/homepage` - The homepage singleton
/// - `DELETE /invalidate/listing/:id` - Every storefront including a listing
/// - `PUT|DELETE /index/:listing_id/:slug` - Maintain the listing -> slug index
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/invalidate/storefront/:slug",
            delete(invalidate_storefront_handler),
        )
        .route("/invalidate/pack/:token", delete(invalidate_pack_detail_handler))
        .route(
            "/invalidate/share-token/:token",
            delete(invalidate_share_token_handler),
        )
        .route(
            "/invalidate/user/:id",
            delete(invalidate_user_purchased_handler),
        )
        .route("/invalidate/homepage", delete(invalidate_homepage_handler))
        .route("/invalidate/listing/:id", delete(invalidate_listing_handler))
        .route(
            "/index/:listing_id/:slug",
            put(index_listing_handler).delete(unindex_listing_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! API Handlers
//!
//! HTTP request handlers for the cache's admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{Domain, InMemorySlugIndex, ListingId, MarketCache, UserId};
use crate::error::Result;
use crate::models::{HealthResponse, IndexResponse, InvalidateResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shared cache
    pub cache: Arc<MarketCache>,
    /// Listing -> storefront slugs, consulted by cascading invalidation
    pub slugs: Arc<InMemorySlugIndex>,
}

impl AppState {
    pub fn new(cache: Arc<MarketCache>, slugs: Arc<InMemorySlugIndex>) -> Self {
        Self { cache, slugs }
    }
}

/// Handler for DELETE /invalidate/storefront/:slug
///
/// Drops every cached filter/sort/search/category variant of one storefront.
pub async fn invalidate_storefront_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_storefront(&slug).await;
    Json(InvalidateResponse::new(Domain::Storefront, slug, removed))
}

/// Handler for DELETE /invalidate/pack/:token
pub async fn invalidate_pack_detail_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_pack_detail(&token).await;
    Json(InvalidateResponse::new(
        Domain::PackDetail,
        token,
        usize::from(removed),
    ))
}

/// Handler for DELETE /invalidate/share-token/:token
pub async fn invalidate_share_token_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_share_token(&token).await;
    Json(InvalidateResponse::new(
        Domain::ShareToken,
        token,
        usize::from(removed),
    ))
}

/// Handler for DELETE /invalidate/user/:id
///
/// Non-numeric ids are rejected by the `Path` extractor with 400.
pub async fn invalidate_user_purchased_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_user_purchased(user_id).await;
    Json(InvalidateResponse::new(
        Domain::UserPurchased,
        user_id.to_string(),
        usize::from(removed),
    ))
}

/// Handler for DELETE /invalidate/homepage
pub async fn invalidate_homepage_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_homepage().await;
    Json(InvalidateResponse::new(
        Domain::Homepage,
        "homepage",
        usize::from(removed),
    ))
}

/// Handler for DELETE /invalidate/listing/:id
///
/// Cascades to every storefront that includes the listing. A failed slug lookup is
/// reported to the caller and leaves the cache untouched.
pub async fn invalidate_listing_handler(
    State(state): State<AppState>,
    Path(listing_id): Path<ListingId>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state
        .cache
        .try_invalidate_storefronts_by_listing(state.slugs.as_ref(), listing_id)
        .await?;
    Ok(Json(InvalidateResponse::new(
        Domain::Storefront,
        listing_id.to_string(),
        removed,
    )))
}

/// Handler for PUT /index/:listing_id/:slug
///
/// Records that a storefront includes a listing.
pub async fn index_listing_handler(
    State(state): State<AppState>,
    Path((listing_id, slug)): Path<(ListingId, String)>,
) -> Json<IndexResponse> {
    state.slugs.insert(listing_id, slug.clone());
    Json(IndexResponse { listing_id, slug })
}

/// Handler for DELETE /index/:listing_id/:slug
pub async fn unindex_listing_handler(
    State(state): State<AppState>,
    Path((listing_id, slug)): Path<(ListingId, String)>,
) -> Json<IndexResponse> {
    state.slugs.remove(listing_id, &slug);
    Json(IndexResponse { listing_id, slug })
}

/// Handler for GET /stats
///
/// Returns counters and per-domain entry counts.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{storefront_key, StorefrontView};
    use crate::config::CacheConfig;

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MarketCache::new(CacheConfig::default()).unwrap()),
            Arc::new(InMemorySlugIndex::new()),
        )
    }

    #[tokio::test]
    async fn test_invalidate_storefront_handler() {
        let state = test_state();
        for filter in ["all", "new"] {
            state
                .cache
                .set_storefront(
                    storefront_key("acme", filter, "", "", ""),
                    Arc::new(StorefrontView::default()),
                )
                .await;
        }

        let response =
            invalidate_storefront_handler(State(state.clone()), Path("acme".to_string())).await;
        assert_eq!(response.removed, 2);
        assert_eq!(state.cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_missing_entry_reports_zero() {
        let state = test_state();

        let response =
            invalidate_pack_detail_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(response.removed, 0);

        let response = invalidate_homepage_handler(State(state)).await;
        assert_eq!(response.removed, 0);
    }

    #[tokio::test]
    async fn test_invalidate_user_handler() {
        let state = test_state();
        state
            .cache
            .set_user_purchased(42, &[1, 2].into_iter().collect())
            .await;

        let response = invalidate_user_purchased_handler(State(state.clone()), Path(42)).await;
        assert_eq!(response.removed, 1);
        assert!(state.cache.get_user_purchased(42).await.is_none());
    }

    #[tokio::test]
    async fn test_index_then_cascade() {
        let state = test_state();
        state
            .cache
            .set_storefront(
                storefront_key("acme", "", "", "", ""),
                Arc::new(StorefrontView::default()),
            )
            .await;

        index_listing_handler(State(state.clone()), Path((9, "acme".to_string()))).await;
        let response = invalidate_listing_handler(State(state.clone()), Path(9))
            .await
            .unwrap();
        assert_eq!(response.removed, 1);
        assert_eq!(response.target, "9");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.cache.get_homepage().await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}

//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{CacheStats, Domain};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of lookups that found a live entry
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed by the LRU evictor
    pub evictions: u64,
    /// Entries removed by the TTL sweeper
    pub swept: u64,
    /// Entries removed by invalidation
    pub invalidated: u64,
    /// Flights led; the rest of the callers coalesced onto them
    pub fills: u64,
    /// Callers that waited on another caller's fill
    pub coalesced: u64,
    /// Current number of entries across all domains
    pub total_entries: usize,
    pub entries_by_domain: BTreeMap<Domain, usize>,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            swept: stats.swept,
            invalidated: stats.invalidated,
            fills: stats.fills,
            coalesced: stats.coalesced,
            total_entries: stats.total_entries,
            entries_by_domain: stats.entries_by_domain,
            hit_rate,
        }
    }
}

/// Response body for every invalidation endpoint (DELETE /invalidate/...)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Domain the entries were removed from
    pub domain: Domain,
    /// The slug, token, user or listing that was targeted
    pub target: String,
    /// Number of entries removed (0 if nothing was cached)
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(domain: Domain, target: impl Into<String>, removed: usize) -> Self {
        Self {
            domain,
            target: target.into(),
            removed,
        }
    }
}

/// Response body for slug index updates (PUT /index/:listing_id/:slug)
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub listing_id: i64,
    pub slug: String,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and fills.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::domains::Domain;

// == Stats Counters ==
/// Live counters, updated without taking the store lock.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    swept: AtomicU64,
    invalidated: AtomicU64,
    fills: AtomicU64,
    coalesced: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup outcome.
    pub fn record_lookup(&self, found: bool) {
        if found {
            self.record_hit();
        } else {
            self.record_miss();
        }
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self, count: usize) {
        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Counts a flight led by a caller (the coalesced fill it ran).
    pub fn record_fill(&self) {
        self.fills.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a caller that joined a fill already in flight.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of the counters plus entry counts.
    pub fn snapshot(&self, entries_by_domain: BTreeMap<Domain, usize>) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            total_entries: entries_by_domain.values().sum(),
            entries_by_domain,
        }
    }
}

// == Cache Stats ==
/// Snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to the entry budget
    pub evictions: u64,
    /// Number of expired entries removed by the background sweep
    pub swept: u64,
    /// Number of entries removed by invalidation
    pub invalidated: u64,
    /// Number of fill functions executed
    pub fills: u64,
    /// Number of callers served by another caller's fill
    pub coalesced: u64,
    /// Current number of entries across all domains
    pub total_entries: usize,
    /// Current number of entries per domain
    pub entries_by_domain: BTreeMap<Domain, usize>,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

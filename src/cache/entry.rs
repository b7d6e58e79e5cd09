//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value plus the timing metadata used for expiry and LRU ordering.
///
/// The last access time is kept as a nanosecond offset from `created_at` so it can
/// be bumped through a shared reference while readers hold only the read lock.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    accessed_offset_ns: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a fresh entry; `last_access` starts equal to `created_at`.
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            accessed_offset_ns: AtomicU64::new(0),
        }
    }

    /// Returns a reference to the stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is live only while `now < created_at + ttl`. A read at exactly
    /// `created_at + ttl` is already a miss. A deadline past the clock's range never
    /// expires.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.created_at
            .checked_add(self.ttl)
            .is_some_and(|deadline| now >= deadline)
    }

    // == Last Access ==
    /// Returns the time of the last successful read, or the creation time.
    pub fn last_access(&self) -> Instant {
        self.created_at + Duration::from_nanos(self.accessed_offset_ns.load(Ordering::Relaxed))
    }

    // == Touch ==
    /// Records a successful read at `now`.
    ///
    /// Never moves the access time backwards, even if racing readers observe clocks
    /// out of order.
    pub fn touch(&self, now: Instant) {
        let offset = now.saturating_duration_since(self.created_at).as_nanos();
        let offset = u64::try_from(offset).unwrap_or(u64::MAX);
        self.accessed_offset_ns.fetch_max(offset, Ordering::Relaxed);
    }
}

//! Domain Store Module
//!
//! One typed key-value table per cached view, with lazy TTL checks on read.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::CacheEntry;

// == Domain Store ==
/// A single domain's table of `key -> CacheEntry<V>`, all sharing one TTL.
///
/// The store never deletes on read: expired entries are skipped by `get` and
/// reclaimed by `sweep_expired`, eviction or invalidation.
#[derive(Debug)]
pub struct DomainStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// TTL applied to every entry written into this domain
    ttl: Duration,
}

impl<K, V> DomainStore<K, V>
where
    K: Eq + Hash + Ord + Clone,
{
    // == Constructor ==
    /// Creates an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Get ==
    /// Returns the live entry for `key` and records the access.
    ///
    /// Takes `&self` so it can run under a shared lock; only the entry's atomic
    /// access time changes.
    pub fn get<Q>(&self, key: &Q, now: Instant) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.get(key)?;
        if entry.is_expired_at(now) {
            return None;
        }
        entry.touch(now);
        Some(entry.value())
    }

    // == Set ==
    /// Stores a brand-new entry at `key`, replacing any previous one unconditionally.
    pub fn set(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, CacheEntry::new(value, self.ttl, now));
    }

    // == Remove ==
    /// Removes the entry at `key`. Returns true if something was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    // == Sweep Expired ==
    /// Removes every entry expired at `now`. Returns the number removed.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    // == Oldest ==
    /// Returns the least recently accessed entry's access time and key.
    ///
    /// Ties on access time resolve to the smallest key, so repeated scans over an
    /// unchanged table always pick the same victim.
    pub fn oldest(&self) -> Option<(Instant, &K)> {
        self.entries
            .iter()
            .map(|(key, entry)| (entry.last_access(), key))
            .min()
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn entry(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }
}

impl<V> DomainStore<String, V> {
    // == Remove Prefix ==
    /// Removes every entry whose key starts with `prefix`. Returns the number removed.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }
}

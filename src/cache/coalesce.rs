//! Request Coalescing Module
//!
//! Deduplicates concurrent fills for the same flight key so a cache miss under load
//! triggers one backing-store query instead of a stampede.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::cache::StatsCounters;
use crate::error::{CacheError, Result};

type Slot<T> = Option<Result<T>>;

enum Role<T> {
    Leader(watch::Sender<Slot<T>>),
    Waiter(watch::Receiver<Slot<T>>),
}

// == Request Coalescer ==
/// Runs at most one fill per flight key at a time and hands its outcome to every
/// caller that arrived while it was running.
///
/// The coalescer only shares computation. It never touches the domain tables, so a
/// fill never runs while the store lock is held.
pub struct RequestCoalescer<T> {
    /// Flight key -> receiver for the result of the fill in progress
    flights: Mutex<HashMap<String, watch::Receiver<Slot<T>>>>,
    stats: Arc<StatsCounters>,
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync,
{
    // == Constructor ==
    /// Creates a coalescer that reports fills and coalesced waits to `stats`.
    pub fn new(stats: Arc<StatsCounters>) -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            stats,
        }
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<Slot<T>>>> {
        // The map is only touched in short non-panicking sections
        self.flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the number of fills currently in progress.
    pub fn in_flight(&self) -> usize {
        self.flights().len()
    }

    // == Do Once ==
    /// Runs `fill` unless a fill for `key` is already running, in which case waits
    /// for that one and returns a clone of its outcome.
    ///
    /// Failures are not remembered: the next call after a failed fill runs again. If
    /// the leading caller is dropped before finishing, one of the waiters takes over
    /// and runs its own `fill`.
    pub async fn do_once<F, Fut>(&self, key: &str, fill: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut waited = false;
        loop {
            let role = {
                let mut flights = self.flights();
                match flights.get(key) {
                    Some(rx) => Role::Waiter(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        flights.insert(key.to_string(), rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    let _flight = FlightGuard {
                        flights: &self.flights,
                        key,
                    };
                    self.stats.record_fill();
                    let result = fill().await.map_err(|e| CacheError::fill(key, e));
                    // Publish while still registered so late joiners see the result
                    tx.send_replace(Some(result.clone()));
                    return result;
                }
                Role::Waiter(mut rx) => {
                    // Count the call once even if it waits again after a takeover
                    if !waited {
                        self.stats.record_coalesced();
                        waited = true;
                    }
                    match rx.wait_for(|slot| slot.is_some()).await {
                        Ok(slot) => {
                            if let Some(result) = &*slot {
                                return result.clone();
                            }
                        }
                        Err(_) => {
                            debug!(key, "leading fill dropped, retrying");
                        }
                    }
                }
            }
        }
    }

    // == Do Once With Timeout ==
    /// Like [`do_once`](Self::do_once) but gives up after `timeout`.
    ///
    /// A timed-out leader abandons its fill; any waiters then elect a new leader.
    pub async fn do_once_with_timeout<F, Fut>(
        &self,
        key: &str,
        timeout: Duration,
        fill: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(timeout, self.do_once(key, fill)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                key: key.to_string(),
                timeout,
            }),
        }
    }
}

// == Flight Guard ==
/// Deregisters a flight when its leader finishes or is dropped.
struct FlightGuard<'a, T> {
    flights: &'a Mutex<HashMap<String, watch::Receiver<Slot<T>>>>,
    key: &'a str,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        let mut flights = self
            .flights
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        flights.remove(self.key);
    }
}

//! TTL Sweeper Task
//!
//! Background task that periodically removes expired entries from every domain.
//! Lazy expiry on `get` hides stale entries from readers; the sweeper reclaims the
//! memory of entries nobody reads again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::MarketCache;
use crate::config::MAX_DURATION;

// == Sweeper Handle ==
/// Owns the running sweeper. Dropping the handle also stops the task.
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to exit.
    ///
    /// A sweep already in progress finishes first.
    pub async fn shutdown(self) {
        // A send error means the loop already exited
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "cache sweeper exited abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the sweeper for `cache`, running once per `interval`.
///
/// The first sweep happens one full interval after the call. A panicking sweep is
/// logged and the next tick runs as usual. Intervals above [`MAX_DURATION`] are
/// clamped to it.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MarketCache::new(CacheConfig::default())?);
/// let sweeper = spawn_sweeper(cache.clone(), Duration::from_secs(600));
/// // Later, during shutdown:
/// sweeper.shutdown().await;
/// ```
pub fn spawn_sweeper(cache: Arc<MarketCache>, interval: Duration) -> SweeperHandle {
    spawn_periodic(interval, move || {
        let cache = cache.clone();
        async move { cache.sweep_expired().await }
    })
}

fn spawn_periodic<F, Fut>(interval: Duration, sweep: F) -> SweeperHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = usize> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    if interval > MAX_DURATION {
        warn!(
            requested_secs = interval.as_secs(),
            max_secs = MAX_DURATION.as_secs(),
            "Sweep interval clamped"
        );
    }
    let interval = interval.min(MAX_DURATION);

    let task = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Starting cache sweeper");

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Each cycle runs in its own task so a panic cannot kill the loop
                    match tokio::spawn(sweep()).await {
                        Ok(removed) if removed > 0 => {
                            info!(removed, "TTL sweep removed expired entries");
                        }
                        Ok(_) => debug!("TTL sweep found no expired entries"),
                        Err(err) if err.is_panic() => {
                            error!(error = %err, "TTL sweep panicked; continuing");
                        }
                        Err(err) => warn!(error = %err, "TTL sweep was cancelled"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Cache sweeper stopped");
                    break;
                }
            }
        }
    });

    SweeperHandle { shutdown_tx, task }
}

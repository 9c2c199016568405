//! Self-updating cache: an atomically-swapped immutable snapshot refreshed
//! on its own timer, readers never locking.
//!
//! Simplified relative to a single-flight, conditional-GET cache manager:
//! no conditional GET, no single-flight guard (the timer is the only
//! writer), just "refresh on an interval, keep the old snapshot if the new
//! one fails".

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{CacheError, StartupError};
use crate::ports::CatalogSource;

/// An atomically-swapped, periodically-refreshed snapshot of type `T`.
///
/// `start` performs the first refresh synchronously -- per the contract, the
/// cache is not considered usable (and the caller should not proceed) until
/// that first refresh has either installed a snapshot or failed hard.
pub struct SelfUpdatingCache<T> {
    name: &'static str,
    snapshot: Arc<ArcSwapOption<T>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> SelfUpdatingCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            snapshot: Arc::new(ArcSwapOption::from(None)),
            handle: Mutex::new(None),
        }
    }

    /// Begin the background refresh loop. The first refresh runs inline;
    /// if it fails, `start` returns an error and the loop never starts
    /// (callers should treat this as fatal -- see the processor's `start`).
    pub async fn start<S>(&self, source: Arc<S>, interval: Duration) -> Result<(), StartupError>
    where
        S: CatalogSource<T> + 'static,
    {
        let initial = source.fetch().await?;
        self.snapshot.store(Some(Arc::new(initial)));
        info!(cache = self.name, "initial cache refresh succeeded");

        let snapshot = self.snapshot.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // the interval's first tick fires immediately
            loop {
                tick.tick().await;
                match source.fetch().await {
                    Ok(fresh) => {
                        snapshot.store(Some(Arc::new(fresh)));
                    }
                    Err(e) => {
                        metrics::counter!("cache.refresh.failure", "cache" => name).increment(1);
                        error!(cache = name, error = %e, "cache refresh failed, retaining previous snapshot");
                    }
                }
            }
        });
        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    /// Cancel the refresh loop. An in-flight refresh is aborted; no further
    /// refreshes are scheduled.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }

    /// Return the latest installed snapshot. Never blocks beyond an atomic
    /// pointer load. `None` only before the first successful refresh.
    pub fn service_data(&self) -> Option<Arc<T>> {
        self.snapshot.load_full()
    }
}

#[cfg(test)]
impl<T: Send + Sync + 'static> SelfUpdatingCache<T> {
    /// Installs a snapshot directly, bypassing `start`'s source fetch and
    /// refresh loop. Lets handler-level tests fix a capability map without
    /// standing up a `CatalogSource`.
    pub(crate) fn install_for_test(&self, value: T) {
        self.snapshot.store(Some(Arc::new(value)));
    }
}

/// Convenience for building a [`CacheError`] from a non-2xx/parse failure in
/// a concrete `CatalogSource` implementation.
pub fn malformed(msg: impl Into<String>) -> CacheError {
    CacheError::Malformed(msg.into())
}

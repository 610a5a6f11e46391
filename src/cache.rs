use crate::error::DataError;
use crate::geokey::GeoId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;

/// Cache granularity: one entry for the whole nation, or one per state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    PerState(GeoId),
}

struct CacheEntry<T> {
    value: Arc<T>,
    loaded_at: Instant,
}

/// Session-lifetime memoized store for one externally-fetched dataset.
///
/// Coalescing and retry semantics come from `tokio::sync::OnceCell`:
/// concurrent `get_or_load` calls for the same scope share a single in-flight
/// loader, and a failed load leaves the cell empty so the next call retries
/// instead of returning a cached error. Successful values are never
/// invalidated within a session.
pub struct DatasetCache<T> {
    dataset: &'static str,
    entries: Mutex<HashMap<Scope, Arc<OnceCell<CacheEntry<T>>>>>,
}

impl<T: Send + Sync + 'static> DatasetCache<T> {
    pub fn new(dataset: &'static str) -> Self {
        Self {
            dataset,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `scope`, running `loader` at most once.
    pub async fn get_or_load<F, Fut>(&self, scope: Scope, loader: F) -> Result<Arc<T>, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let cell = {
            let mut entries = self.entries.lock().expect("cache mutex poisoned");
            Arc::clone(entries.entry(scope.clone()).or_default())
        };

        let entry = cell
            .get_or_try_init(|| async {
                let started = Instant::now();
                let value = loader().await?;
                tracing::debug!(
                    dataset = self.dataset,
                    ?scope,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "dataset loaded"
                );
                Ok(CacheEntry {
                    value: Arc::new(value),
                    loaded_at: Instant::now(),
                })
            })
            .await?;

        Ok(Arc::clone(&entry.value))
    }

    /// When the entry for `scope` was loaded, if it is resident.
    pub fn loaded_at(&self, scope: &Scope) -> Option<Instant> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        entries
            .get(scope)
            .and_then(|cell| cell.get())
            .map(|entry| entry.loaded_at)
    }
}

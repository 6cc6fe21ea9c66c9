use crate::clock::Clock;
use crate::errors::CatalogError;
use crate::models::{CacheStats, ListingRecord, RegionBounds, RentAnalytics, SearchCriteria};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Query parameters that identify a cache entry.
///
/// The canonical key is the JSON form, e.g.
/// `{"type":"bounds","north":28.5,"south":28.4,"east":77.1,"west":77.0}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueryKey {
    Bounds(RegionBounds),
    Search(SearchCriteria),
    Analytics {
        city: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        locality: Option<String>,
    },
}

impl QueryKey {
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Listings(Vec<ListingRecord>),
    Analytics(RentAnalytics),
}

/// A memoized result and the time it was computed.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub computed_at: DateTime<Utc>,
}

/// TTL memoization for catalog queries.
///
/// Freshness is judged against the injected [`Clock`]; moka's own
/// `time_to_live` and capacity bound keep memory in check. Concurrent misses
/// on the same key share one computation.
pub struct QueryCache {
    entries: Cache<String, Arc<CacheEntry>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(ttl: Duration, max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_entries)
            .build();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));

        Self {
            entries,
            ttl,
            clock,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.computed_at < self.ttl
    }

    /// Returns the fresh entry for `key`, or runs `compute` and stores its
    /// result. Errors are returned to every waiter and never stored.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &QueryKey,
        compute: F,
    ) -> Result<Arc<CacheEntry>, CatalogError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedValue, CatalogError>>,
    {
        let key = key.canonical();

        if let Some(entry) = self.entries.get(&key).await {
            if self.is_fresh(&entry) {
                tracing::debug!("Catalog cache HIT: {}", key);
                return Ok(entry);
            }
            tracing::debug!("Catalog cache STALE: {}", key);
            self.entries.invalidate(&key).await;
        }

        tracing::info!("Catalog cache MISS: {}", key);
        let clock = Arc::clone(&self.clock);
        self.entries
            .try_get_with(key, async move {
                let value = compute().await?;
                Ok::<_, CatalogError>(Arc::new(CacheEntry {
                    value,
                    computed_at: clock.now(),
                }))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        tracing::info!("Catalog cache cleared");
    }

    /// Fresh entries only, keys sorted.
    pub async fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks().await;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_fresh(entry))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.sort();

        CacheStats {
            size: keys.len() as u64,
            keys,
        }
    }
}

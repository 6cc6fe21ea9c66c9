/// Queryable rental catalog over the fixture set
///
/// The catalog answers four kinds of questions:
/// 1. Which listings fall inside a map viewport (`query_by_region`)
/// 2. Which listings match a set of search filters (`query_by_criteria`)
/// 3. What rents look like in a city (`compute_analytics`)
/// 4. What each upstream aggregator returns for a viewport (`fetch_all_sources`)
///
/// Every call pays a simulated network latency, and listing results carry
/// a small random rent jitter so the front end sees "live" numbers. Results
/// of the first three are memoized in a TTL cache.
use crate::cache::{CacheEntry, CachedValue, QueryCache, QueryKey};
use crate::clock::{Clock, SystemClock};
use crate::config::{CatalogConfig, LatencyRange};
use crate::errors::CatalogError;
use crate::feed::{LiveFeed, REGION_JITTER, SEARCH_JITTER};
use crate::fixtures;
use crate::models::*;
use crate::sources::SourcePartition;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct PropertyCatalog {
    config: CatalogConfig,
    listings: Vec<ListingRecord>,
    sources: Vec<SourcePartition>,
    cache: QueryCache,
    feed: LiveFeed,
    clock: Arc<dyn Clock>,
}

impl PropertyCatalog {
    /// Builds a catalog that owns `listings`.
    ///
    /// Listings are validated first; a record with a non-positive rent,
    /// bedroom count or area fails construction with `InvalidFixture`.
    pub fn new(
        config: CatalogConfig,
        listings: Vec<ListingRecord>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CatalogError> {
        let listings = fixtures::prepare(listings)?;
        let sources = config
            .sources
            .iter()
            .map(|spec| SourcePartition::new(spec, &listings))
            .collect();
        let cache = QueryCache::new(
            config.cache_ttl,
            config.cache_max_entries,
            Arc::clone(&clock),
        );
        let feed = LiveFeed::new(config.seed);

        tracing::info!(
            "Catalog ready: {} listings across {} sources",
            listings.len(),
            config.sources.len()
        );

        Ok(Self {
            config,
            listings,
            sources,
            cache,
            feed,
            clock,
        })
    }

    /// Catalog over the embedded dataset, stamped with the system clock.
    pub fn with_builtin_listings(config: CatalogConfig) -> Result<Self, CatalogError> {
        let listings = fixtures::builtin_listings()?;
        Self::new(config, listings, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The validated fixtures, as listed (no jitter).
    pub fn listings(&self) -> &[ListingRecord] {
        &self.listings
    }

    async fn simulate_latency(&self, range: LatencyRange) {
        let delay = self.feed.latency(range);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Copies `listing` with jittered rent and a refreshed timestamp.
    fn live_copy(&self, listing: &ListingRecord, jitter: f64) -> ListingRecord {
        let mut live = listing.clone();
        live.rent = self.feed.perturb_rent(listing.rent, jitter);
        live.last_updated = live.last_updated.max(self.clock.now());
        live
    }

    fn listings_from(
        entry: Result<Arc<CacheEntry>, CatalogError>,
        operation: &str,
    ) -> Vec<ListingRecord> {
        match entry {
            Ok(entry) => match &entry.value {
                CachedValue::Listings(listings) => listings.clone(),
                CachedValue::Analytics(_) => {
                    tracing::error!("{}: cache entry holds analytics", operation);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::error!("{} failed: {}", operation, e);
                Vec::new()
            }
        }
    }

    /// Listings inside `bounds`, rent jittered by up to ±10%.
    ///
    /// Malformed bounds (north < south, east < west, non-finite edges) give
    /// an empty result rather than an error.
    pub async fn query_by_region(&self, bounds: RegionBounds) -> Vec<ListingRecord> {
        if !bounds.is_valid() {
            tracing::warn!("Ignoring region query with invalid bounds: {:?}", bounds);
            return Vec::new();
        }

        let entry = self
            .cache
            .get_or_compute(&QueryKey::Bounds(bounds), move || async move {
                self.simulate_latency(self.config.region_latency).await;

                let live: Vec<ListingRecord> = self
                    .listings
                    .iter()
                    .filter(|l| bounds.contains(l.lat, l.lng))
                    .map(|l| self.live_copy(l, REGION_JITTER))
                    .collect();

                tracing::info!("Region query matched {} listings", live.len());
                Ok(CachedValue::Listings(live))
            })
            .await;

        Self::listings_from(entry, "query_by_region")
    }

    /// Listings matching every supplied filter, rent jittered by up to ±5%.
    pub async fn query_by_criteria(&self, criteria: &SearchCriteria) -> Vec<ListingRecord> {
        let entry = self
            .cache
            .get_or_compute(&QueryKey::Search(criteria.clone()), move || async move {
                self.simulate_latency(self.config.search_latency).await;

                let live: Vec<ListingRecord> = self
                    .listings
                    .iter()
                    .filter(|l| criteria.matches(l))
                    .map(|l| self.live_copy(l, SEARCH_JITTER))
                    .collect();

                tracing::info!("Search {:?} matched {} listings", criteria, live.len());
                Ok(CachedValue::Listings(live))
            })
            .await;

        Self::listings_from(entry, "query_by_criteria")
    }

    /// Rent figures for `city` (case-insensitive), optionally narrowed to
    /// localities containing `locality`.
    ///
    /// Fails with `NotFound` when nothing matches; no zeroed figures are
    /// ever returned.
    pub async fn compute_analytics(
        &self,
        city: &str,
        locality: Option<&str>,
    ) -> Result<RentAnalytics, CatalogError> {
        let requested_city = city.trim();
        let requested_locality = locality.map(str::trim).filter(|l| !l.is_empty());
        let city = requested_city.to_lowercase();
        let locality = requested_locality.map(str::to_lowercase);

        let key = QueryKey::Analytics {
            city: city.clone(),
            locality: locality.clone(),
        };

        let entry = self
            .cache
            .get_or_compute(&key, move || async move {
                self.simulate_latency(self.config.analytics_latency).await;

                let subset: Vec<&ListingRecord> = self
                    .listings
                    .iter()
                    .filter(|l| l.city.to_lowercase() == city)
                    .filter(|l| match locality {
                        Some(ref wanted) => contains_ignore_case(&l.locality, wanted),
                        None => true,
                    })
                    .collect();

                if subset.is_empty() {
                    let place = match requested_locality {
                        Some(l) => format!("{}, {}", l, requested_city),
                        None => requested_city.to_string(),
                    };
                    return Err(CatalogError::NotFound(format!("No data found for {}", place)));
                }

                Ok(CachedValue::Analytics(self.summarize(&subset)))
            })
            .await?;

        match &entry.value {
            CachedValue::Analytics(analytics) => Ok(analytics.clone()),
            CachedValue::Listings(_) => Err(CatalogError::Internal(
                "analytics cache entry holds listings".to_string(),
            )),
        }
    }

    fn summarize(&self, subset: &[&ListingRecord]) -> RentAnalytics {
        let mut rents: Vec<u32> = subset.iter().map(|l| l.rent).collect();
        rents.sort_unstable();

        let total_rent: u64 = rents.iter().map(|&r| r as u64).sum();
        let total_area: f64 = subset.iter().map(|l| l.area).sum();
        let count = rents.len();

        RentAnalytics {
            average_rent: (total_rent as f64 / count as f64).round() as u32,
            // Upper middle for even counts.
            median_rent: rents[count / 2],
            price_per_sqft: total_rent as f64 / total_area,
            rent_trend: self.feed.synthetic_trend(),
            total_listings: count,
            last_updated: self.clock.now(),
        }
    }

    /// Queries every source concurrently and joins the results.
    ///
    /// A source that fails contributes an empty list, both to `combined`
    /// and to its own `by_source` slot; the others are unaffected.
    pub async fn fetch_all_sources(&self, bounds: RegionBounds) -> SourcesSnapshot {
        let mut snapshot = SourcesSnapshot::default();

        if !bounds.is_valid() {
            tracing::warn!("Ignoring source fan-out with invalid bounds: {:?}", bounds);
            for source in &self.sources {
                snapshot.by_source.insert(source.name().to_string(), Vec::new());
            }
            return snapshot;
        }

        let page_size = self.config.source_page_size;
        let results = join_all(self.sources.iter().map(|source| async move {
            (source.name(), source.fetch_guarded(bounds, page_size).await)
        }))
        .await;

        for (name, result) in results {
            let listings = match result {
                Ok(listings) => listings,
                Err(e) => {
                    tracing::warn!("Source '{}' contributed nothing: {}", name, e);
                    Vec::new()
                }
            };
            snapshot.combined.extend(listings.iter().cloned());
            snapshot.by_source.insert(name.to_string(), listings);
        }

        tracing::info!(
            "Fan-out over {} sources returned {} listings",
            self.sources.len(),
            snapshot.combined.len()
        );
        snapshot
    }

    /// Simulates an outage (or recovery) of the named source.
    pub fn set_source_online(&self, name: &str, online: bool) -> Result<(), CatalogError> {
        let source = self
            .sources
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| CatalogError::NotFound(format!("Unknown source '{}'", name)))?;
        source.set_online(online);
        Ok(())
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

/// Races `fut` against a caller-imposed deadline.
///
/// When the deadline fires the future is dropped; nothing it would have
/// cached is written, and the caller gets `Timeout`.
pub async fn with_deadline<F, T>(
    deadline: Duration,
    operation: &str,
    fut: F,
) -> Result<T, CatalogError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| CatalogError::Timeout {
            operation: operation.to_string(),
            deadline_ms: deadline.as_millis() as u64,
        })
}

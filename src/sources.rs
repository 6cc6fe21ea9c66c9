/// Simulated upstream aggregators
///
/// Each configured source owns the slice of fixtures it "supplies" and
/// answers with its own fixed latency. A source can be switched offline to
/// simulate an outage; repeated failures open its circuit breaker.
use crate::circuit_breaker::{create_source_circuit_breaker, SourceBreaker};
use crate::config::SourceSpec;
use crate::errors::CatalogError;
use crate::models::{ListingRecord, RegionBounds};
use failsafe::futures::CircuitBreaker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct SourcePartition {
    name: String,
    latency: Duration,
    listings: Vec<ListingRecord>,
    online: AtomicBool,
    breaker: SourceBreaker,
}

impl SourcePartition {
    /// Takes the listings of `all` whose `source` equals `spec.name`,
    /// preserving fixture order.
    pub fn new(spec: &SourceSpec, all: &[ListingRecord]) -> Self {
        let listings = all
            .iter()
            .filter(|l| l.source == spec.name)
            .cloned()
            .collect();

        Self {
            name: spec.name.clone(),
            latency: spec.latency,
            listings,
            online: AtomicBool::new(true),
            breaker: create_source_circuit_breaker(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        tracing::info!(
            "Source '{}' switched {}",
            self.name,
            if online { "online" } else { "offline" }
        );
    }

    async fn fetch(
        &self,
        bounds: RegionBounds,
        page_size: usize,
    ) -> Result<Vec<ListingRecord>, CatalogError> {
        tokio::time::sleep(self.latency).await;

        if !self.is_online() {
            return Err(CatalogError::SourceUnavailable(format!(
                "{} did not respond",
                self.name
            )));
        }

        Ok(self
            .listings
            .iter()
            .filter(|l| bounds.contains(l.lat, l.lng))
            .take(page_size)
            .cloned()
            .collect())
    }

    /// Fetches through the circuit breaker; an open circuit is reported as
    /// `SourceUnavailable` without waiting for the source.
    pub async fn fetch_guarded(
        &self,
        bounds: RegionBounds,
        page_size: usize,
    ) -> Result<Vec<ListingRecord>, CatalogError> {
        match self.breaker.call(self.fetch(bounds, page_size)).await {
            Ok(listings) => Ok(listings),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(CatalogError::SourceUnavailable(format!(
                "{} circuit open",
                self.name
            ))),
        }
    }
}

//! Seedable randomness behind the catalog's simulated "live" data.
//!
//! Every random draw the catalog makes (latency samples, rent jitter, the
//! synthetic rent trend) goes through [`LiveFeed`], so a seeded catalog is
//! fully reproducible.

use crate::config::LatencyRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Max rent jitter applied to region queries (fraction of listed rent).
pub const REGION_JITTER: f64 = 0.10;
/// Max rent jitter applied to criteria searches (fraction of listed rent).
pub const SEARCH_JITTER: f64 = 0.05;
/// Bound of the synthetic trend percentage, in both directions.
pub const TREND_SPAN: f64 = 10.0;

pub struct LiveFeed {
    rng: Mutex<StdRng>,
}

impl LiveFeed {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Uniform sample in [0, 1).
    fn unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        rng.gen::<f64>()
    }

    /// Draws a simulated network delay from `range`.
    pub fn latency(&self, range: LatencyRange) -> Duration {
        if range.min_ms == range.max_ms {
            return Duration::from_millis(range.min_ms);
        }
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        Duration::from_millis(rng.gen_range(range.min_ms..=range.max_ms))
    }

    /// Moves `rent` by at most `max_fraction` of itself in either direction.
    /// Never returns less than 1.
    pub fn perturb_rent(&self, rent: u32, max_fraction: f64) -> u32 {
        let offset = ((self.unit() * 2.0 - 1.0) * max_fraction * rent as f64).floor();
        let jittered = rent as f64 + offset;
        jittered.max(1.0).min(u32::MAX as f64) as u32
    }

    /// Placeholder trend percentage in [-TREND_SPAN, TREND_SPAN], one decimal.
    ///
    /// There is no period-over-period data behind this; it exists so the
    /// front end has a signed figure to render.
    pub fn synthetic_trend(&self) -> f64 {
        let raw = (self.unit() - 0.5) * 2.0 * TREND_SPAN;
        (raw * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let a = LiveFeed::new(Some(7));
        let b = LiveFeed::new(Some(7));

        for _ in 0..20 {
            assert_eq!(a.perturb_rent(50_000, REGION_JITTER), b.perturb_rent(50_000, REGION_JITTER));
        }
        assert_eq!(a.synthetic_trend(), b.synthetic_trend());
    }

    #[test]
    fn test_perturbation_stays_within_fraction() {
        let feed = LiveFeed::new(Some(1));
        for _ in 0..500 {
            let rent = feed.perturb_rent(40_000, SEARCH_JITTER);
            assert!((38_000..=42_000).contains(&rent), "rent out of range: {}", rent);
        }
    }

    #[test]
    fn test_perturbation_never_reaches_zero() {
        let feed = LiveFeed::new(Some(3));
        for _ in 0..200 {
            assert!(feed.perturb_rent(1, 0.99) >= 1);
        }
    }

    #[test]
    fn test_trend_is_bounded_with_one_decimal() {
        let feed = LiveFeed::new(Some(11));
        for _ in 0..500 {
            let trend = feed.synthetic_trend();
            assert!((-TREND_SPAN..=TREND_SPAN).contains(&trend));
            assert!(((trend * 10.0).round() - trend * 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_latency_within_range() {
        let feed = LiveFeed::new(Some(5));
        for _ in 0..100 {
            let d = feed.latency(LatencyRange::new(800, 1200));
            assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1200));
        }
        assert_eq!(feed.latency(LatencyRange::zero()), Duration::ZERO);
    }
}

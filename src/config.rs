use std::time::Duration;

/// Inclusive range of simulated latency in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub const fn zero() -> Self {
        Self::fixed(0)
    }

    /// Parses `"800-1200"` or a single value such as `"900"`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let (min, max) = match raw.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (raw, raw),
        };
        let min_ms: u64 = min
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid latency lower bound '{}'", min))?;
        let max_ms: u64 = max
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid latency upper bound '{}'", max))?;
        if min_ms > max_ms {
            anyhow::bail!("latency range '{}' has min > max", raw);
        }
        Ok(Self { min_ms, max_ms })
    }
}

/// A simulated upstream aggregator and its fixed response latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub latency: Duration,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub port: u16,
    /// Age after which a cached result is recomputed.
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
    pub region_latency: LatencyRange,
    pub search_latency: LatencyRange,
    pub analytics_latency: LatencyRange,
    /// Fan-out partitions, in the order their results are concatenated.
    pub sources: Vec<SourceSpec>,
    /// Max records a single source partition returns.
    pub source_page_size: usize,
    /// Deadline the HTTP layer applies to every catalog call.
    pub request_deadline: Duration,
    /// Seed for the live-feed generator; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 10_000,
            region_latency: LatencyRange::new(800, 1200),
            search_latency: LatencyRange::new(700, 1100),
            analytics_latency: LatencyRange::new(600, 900),
            sources: default_sources(),
            source_page_size: 3,
            request_deadline: Duration::from_millis(5000),
            seed: None,
        }
    }
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("99acres", Duration::from_millis(1000)),
        SourceSpec::new("magicbricks", Duration::from_millis(1200)),
        SourceSpec::new("housing", Duration::from_millis(900)),
    ]
}

impl CatalogConfig {
    /// Defaults with every simulated delay removed and a fixed seed.
    pub fn instant() -> Self {
        Self {
            region_latency: LatencyRange::zero(),
            search_latency: LatencyRange::zero(),
            analytics_latency: LatencyRange::zero(),
            sources: default_sources()
                .into_iter()
                .map(|s| SourceSpec::new(s.name, Duration::ZERO))
                .collect(),
            seed: Some(42),
            ..Self::default()
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            cache_ttl: match std::env::var("CACHE_TTL_SECS") {
                Ok(raw) => {
                    let secs: u64 = raw
                        .trim()
                        .parse()
                        .map_err(|_| anyhow::anyhow!("CACHE_TTL_SECS must be a number"))?;
                    if secs == 0 {
                        anyhow::bail!("CACHE_TTL_SECS must be greater than zero");
                    }
                    Duration::from_secs(secs)
                }
                Err(_) => defaults.cache_ttl,
            },
            cache_max_entries: match std::env::var("CACHE_MAX_ENTRIES") {
                Ok(raw) => parse_cache_max_entries(&raw)?,
                Err(_) => defaults.cache_max_entries,
            },
            region_latency: latency_from_env("REGION_LATENCY_MS", defaults.region_latency)?,
            search_latency: latency_from_env("SEARCH_LATENCY_MS", defaults.search_latency)?,
            analytics_latency: latency_from_env(
                "ANALYTICS_LATENCY_MS",
                defaults.analytics_latency,
            )?,
            sources: defaults.sources,
            source_page_size: std::env::var("SOURCE_PAGE_SIZE")
                .unwrap_or_else(|_| defaults.source_page_size.to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SOURCE_PAGE_SIZE must be a number"))?,
            request_deadline: std::env::var("REQUEST_DEADLINE_MS")
                .ok()
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|_| anyhow::anyhow!("REQUEST_DEADLINE_MS must be a number"))
                })
                .transpose()?
                .unwrap_or(defaults.request_deadline),
            seed: std::env::var("CATALOG_SEED")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| anyhow::anyhow!("CATALOG_SEED must be an unsigned integer"))
                })
                .transpose()?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Cache TTL: {}s, capacity: {}",
            config.cache_ttl.as_secs(),
            config.cache_max_entries
        );
        if let Some(seed) = config.seed {
            tracing::info!("Live feed seeded with {}", seed);
        }

        Ok(config)
    }
}

fn parse_cache_max_entries(raw: &str) -> anyhow::Result<u64> {
    let entries: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("CACHE_MAX_ENTRIES must be a number"))?;
    if entries == 0 {
        anyhow::bail!("CACHE_MAX_ENTRIES must be greater than zero");
    }
    Ok(entries)
}

fn latency_from_env(var: &str, default: LatencyRange) -> anyhow::Result<LatencyRange> {
    match std::env::var(var) {
        Ok(raw) => LatencyRange::parse(&raw).map_err(|e| anyhow::anyhow!("{}: {}", var, e)),
        Err(_) => Ok(default),
    }
}

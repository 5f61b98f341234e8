use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::ranking::domain::{Destination, DestinationKey, MetricKind};

/// Capability to fetch the current value of a market metric.
///
/// Implementations own their transport details, including a bounded call
/// timeout; any error is a transient failure the resolver absorbs. Retry
/// cadence belongs to the circuit breaker, not to the call itself.
pub trait MetricProvider: Send + Sync {
    fn fetch(&self, destination: &Destination, metric: MetricKind) -> Result<f64, ProviderError>;
}

/// Transient failure of a live provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider is not configured for {0}")]
    Unconfigured(&'static str),
    #[error("provider call timed out after {0} seconds")]
    Timeout(u64),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Cached metric value with its storage timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue {
    pub value: f64,
    pub stored_at: DateTime<Utc>,
}

/// Keyed value cache with explicit TTL checks performed by the caller.
pub trait MetricCache: Send + Sync {
    fn get(&self, destination: &DestinationKey, metric: MetricKind) -> Option<CachedValue>;
    fn put(
        &self,
        destination: &DestinationKey,
        metric: MetricKind,
        value: f64,
        stored_at: DateTime<Utc>,
    );
}

/// Time-to-live per market metric before a cache entry stops counting as a
/// usable fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtls {
    pub exchange_rate: Duration,
    pub flight_cost: Duration,
    pub cost_of_living: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            exchange_rate: Duration::hours(4),
            flight_cost: Duration::hours(48),
            cost_of_living: Duration::hours(720),
        }
    }
}

impl CacheTtls {
    pub fn for_metric(&self, metric: MetricKind) -> Duration {
        match metric {
            MetricKind::ExchangeRate => self.exchange_rate,
            MetricKind::FlightCost => self.flight_cost,
            MetricKind::CostOfLiving => self.cost_of_living,
            // Static metrics are never cached.
            MetricKind::Safety | MetricKind::Visa | MetricKind::Accessibility => Duration::zero(),
        }
    }
}

/// Process-local cache backing the binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<(DestinationKey, MetricKind), CachedValue>>,
}

impl MetricCache for InMemoryCache {
    fn get(&self, destination: &DestinationKey, metric: MetricKind) -> Option<CachedValue> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(&(destination.clone(), metric))
            .copied()
    }

    fn put(
        &self,
        destination: &DestinationKey,
        metric: MetricKind,
        value: f64,
        stored_at: DateTime<Utc>,
    ) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert((destination.clone(), metric), CachedValue { value, stored_at });
    }
}

#[derive(Debug, Deserialize, Default)]
struct QuoteEntry {
    exchange_rate: Option<f64>,
    flight_cost: Option<f64>,
    monthly_col: Option<f64>,
}

/// Provider serving current quotes from a static document, standing in for
/// the external flight/exchange-rate APIs. Destinations absent from the
/// document fail like an unconfigured upstream and fall back to baseline.
#[derive(Debug, Default)]
pub struct StaticQuoteProvider {
    quotes: HashMap<String, QuoteEntry>,
}

impl StaticQuoteProvider {
    pub fn from_path(path: &Path) -> Result<Self, QuoteFileError> {
        let mut raw = String::new();
        File::open(path)
            .map_err(|source| QuoteFileError::Io {
                path: path.display().to_string(),
                source,
            })?
            .read_to_string(&mut raw)
            .map_err(|source| QuoteFileError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, QuoteFileError> {
        let quotes = serde_json::from_str(raw)?;
        Ok(Self { quotes })
    }
}

/// Failure to load a quote document.
#[derive(Debug, thiserror::Error)]
pub enum QuoteFileError {
    #[error("failed to read quote file {path}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse quote file")]
    Parse(#[from] serde_json::Error),
}

impl MetricProvider for StaticQuoteProvider {
    fn fetch(&self, destination: &Destination, metric: MetricKind) -> Result<f64, ProviderError> {
        let entry = self
            .quotes
            .get(&destination.key.0)
            .ok_or(ProviderError::Unconfigured("destination"))?;
        let value = match metric {
            MetricKind::ExchangeRate => entry.exchange_rate,
            MetricKind::FlightCost => entry.flight_cost,
            MetricKind::CostOfLiving => entry.monthly_col,
            MetricKind::Safety | MetricKind::Visa | MetricKind::Accessibility => None,
        };
        value.ok_or(ProviderError::Unconfigured("metric"))
    }
}

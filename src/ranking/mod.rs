//! Destination attractiveness ranking: resilient metric resolution, hybrid
//! momentum/absolute scoring, and daily history recording.

pub mod breaker;
pub mod catalog;
pub mod domain;
pub mod events;
pub mod export;
pub mod history;
pub mod providers;
pub mod quality;
pub mod resolver;
pub mod scoring;
pub mod service;

#[cfg(test)]
pub(crate) mod tests;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStatus};
pub use catalog::{CatalogError, DestinationCatalog};
pub use domain::{
    Badge, Baseline, BaselineSet, Confidence, DataQualitySummary, Destination, DestinationKey,
    DestinationScoreResult, MetricKind, Provenance, ResolvedMetric, StaticIndicator, SubScore,
    TrendLabel, VisaCategory,
};
pub use events::{EventSink, ResilienceEvent, TracingSink};
pub use export::{export_csv, export_csv_to_path, ExportError};
pub use history::{HistoryError, HistorySnapshot, HistoryStore, InMemoryHistoryStore};
pub use providers::{
    CacheTtls, CachedValue, InMemoryCache, MetricCache, MetricProvider, ProviderError,
    QuoteFileError, StaticQuoteProvider,
};
pub use resolver::MetricResolver;
pub use scoring::{ScoringEngine, ScoringWeights, WeightError};
pub use service::RankingService;

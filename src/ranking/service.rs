//! Orchestration of a full ranking cycle over the catalog.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::ranking::breaker::CircuitStatus;
use crate::ranking::catalog::DestinationCatalog;
use crate::ranking::domain::{Destination, DestinationKey, DestinationScoreResult, MetricKind};
use crate::ranking::events::{EventSink, ResilienceEvent};
use crate::ranking::history::{HistoryError, HistorySnapshot, HistoryStore};
use crate::ranking::providers::{MetricCache, MetricProvider};
use crate::ranking::quality;
use crate::ranking::resolver::MetricResolver;
use crate::ranking::scoring::{ScoringEngine, WeightError};

/// The ranking engine's front door: resolves, scores and records every
/// destination in the catalog.
///
/// Destinations are independent; only the breakers and the cache are shared
/// across the cycle.
pub struct RankingService<P, C, H> {
    catalog: Arc<DestinationCatalog>,
    engine: ScoringEngine,
    resolver: Arc<MetricResolver<P, C>>,
    history: Arc<H>,
    events: Arc<dyn EventSink>,
    fresh_after: Duration,
}

impl<P, C, H> RankingService<P, C, H>
where
    P: MetricProvider + 'static,
    C: MetricCache + 'static,
    H: HistoryStore + 'static,
{
    pub fn new(
        catalog: Arc<DestinationCatalog>,
        resolver: Arc<MetricResolver<P, C>>,
        history: Arc<H>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, WeightError> {
        let engine = ScoringEngine::new(catalog.weights())?;
        Ok(Self {
            catalog,
            engine,
            resolver,
            history,
            events,
            fresh_after: quality::default_fresh_after(),
        })
    }

    pub fn catalog(&self) -> &DestinationCatalog {
        &self.catalog
    }

    pub fn circuit_statuses(&self) -> Vec<CircuitStatus> {
        self.resolver.circuit_statuses()
    }

    pub fn history_since(
        &self,
        destination: &DestinationKey,
        since: NaiveDate,
    ) -> Result<Vec<HistorySnapshot>, HistoryError> {
        self.history.query(destination, since)
    }

    /// Score one destination at `now`: resolve its market metrics, summarize
    /// provenance, blend, and record the day's snapshot.
    pub fn evaluate(&self, destination: &Destination, now: DateTime<Utc>) -> DestinationScoreResult {
        let resolved: Vec<_> = MetricKind::MARKET
            .into_iter()
            .map(|metric| self.resolver.resolve(destination, metric, now))
            .collect();

        let data_quality = quality::summarize(&resolved, self.fresh_after);
        self.events.record(ResilienceEvent::QualitySummary {
            destination: destination.key.clone(),
            confidence: data_quality.confidence,
        });

        let raw_values: BTreeMap<_, _> = resolved
            .iter()
            .map(|metric| (metric.metric, metric.value))
            .collect();
        let sub_scores = self.engine.sub_scores(destination, &resolved);
        let result = self
            .engine
            .score(destination, sub_scores, data_quality, now);

        // History is an observer of the cycle, never a gate on it.
        let snapshot = HistorySnapshot::from_result(&result, raw_values);
        if let Err(error) = self.history.upsert(snapshot) {
            warn!(destination = %destination.key, %error, "failed to record history snapshot");
        }

        result
    }

    /// Run a full cycle: one blocking task per destination, results sorted
    /// by final score descending with the key as a deterministic tie-break.
    pub async fn run_cycle(self: &Arc<Self>, now: DateTime<Utc>) -> Vec<DestinationScoreResult> {
        let mut tasks = JoinSet::new();
        for destination in self.catalog.destinations().cloned() {
            let service = Arc::clone(self);
            tasks.spawn_blocking(move || service.evaluate(&destination, now));
        }

        let mut results = Vec::with_capacity(self.catalog.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(join_error) => {
                    error!(%join_error, "destination evaluation task failed");
                }
            }
        }

        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        results
    }
}

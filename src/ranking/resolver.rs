//! Resilience wrapper around the metric providers.
//!
//! Resolution never fails: a live call is attempted only when the provider's
//! circuit allows it, and every failure path degrades through the cache to
//! the catalog baseline, tagging the provenance tier along the way.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::ranking::breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitStatus, CircuitTransition,
};
use crate::ranking::domain::{Destination, MetricKind, Provenance, ResolvedMetric};
use crate::ranking::events::{EventSink, ResilienceEvent};
use crate::ranking::providers::{CacheTtls, MetricCache, MetricProvider};

pub struct MetricResolver<P, C> {
    provider: Arc<P>,
    cache: Arc<C>,
    ttls: CacheTtls,
    breakers: HashMap<MetricKind, CircuitBreaker>,
    events: Arc<dyn EventSink>,
}

impl<P, C> MetricResolver<P, C>
where
    P: MetricProvider,
    C: MetricCache,
{
    pub fn new(
        provider: Arc<P>,
        cache: Arc<C>,
        ttls: CacheTtls,
        breaker_config: CircuitBreakerConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let breakers = MetricKind::MARKET
            .into_iter()
            .map(|metric| {
                (
                    metric,
                    CircuitBreaker::new(provider_name(metric), breaker_config),
                )
            })
            .collect();
        Self {
            provider,
            cache,
            ttls,
            breakers,
            events,
        }
    }

    /// Circuit status per provider, for health reporting.
    pub fn circuit_statuses(&self) -> Vec<CircuitStatus> {
        MetricKind::MARKET
            .into_iter()
            .filter_map(|metric| self.breakers.get(&metric))
            .map(CircuitBreaker::status)
            .collect()
    }

    /// Resolve one market metric for a destination at `now`.
    ///
    /// Always returns a value: the catalog guarantees a baseline exists, so
    /// no error can escape this layer.
    pub fn resolve(
        &self,
        destination: &Destination,
        metric: MetricKind,
        now: DateTime<Utc>,
    ) -> ResolvedMetric {
        let breaker = self
            .breakers
            .get(&metric)
            .expect("market metrics all carry a breaker");

        let (permit, transition) = breaker.try_acquire(now);
        self.emit_transition(breaker, transition);

        if permit == CallPermit::Allowed {
            match self.provider.fetch(destination, metric) {
                Ok(value) => {
                    let transition = breaker.record_success();
                    self.emit_transition(breaker, transition);
                    self.cache.put(&destination.key, metric, value, now);
                    return ResolvedMetric {
                        metric,
                        value,
                        provenance: Provenance::Live,
                        resolved_at: now,
                        staleness: Duration::zero(),
                    };
                }
                Err(error) => {
                    debug!(
                        provider = breaker.provider(),
                        destination = %destination.key,
                        %error,
                        "live fetch failed"
                    );
                    let transition = breaker.record_failure(now);
                    self.emit_transition(breaker, transition);
                }
            }
        }

        let fallback = self.fallback(destination, metric, now);
        self.events.record(ResilienceEvent::Fallback {
            provider: breaker.provider().to_string(),
            destination: destination.key.clone(),
            metric,
            tier: fallback.provenance,
        });
        fallback
    }

    fn fallback(
        &self,
        destination: &Destination,
        metric: MetricKind,
        now: DateTime<Utc>,
    ) -> ResolvedMetric {
        if let Some(cached) = self.cache.get(&destination.key, metric) {
            let age = now - cached.stored_at;
            if age <= self.ttls.for_metric(metric) {
                return ResolvedMetric {
                    metric,
                    value: cached.value,
                    provenance: Provenance::Cache,
                    resolved_at: now,
                    staleness: age,
                };
            }
        }

        let baseline = destination
            .baselines
            .market_value(metric)
            .expect("market metrics carry a baseline by catalog invariant");
        let age = now
            .date_naive()
            .signed_duration_since(baseline.calculated_on)
            .max(Duration::zero());
        ResolvedMetric {
            metric,
            value: baseline.value,
            provenance: Provenance::Baseline,
            resolved_at: now,
            staleness: age,
        }
    }

    fn emit_transition(&self, breaker: &CircuitBreaker, transition: Option<CircuitTransition>) {
        if let Some(CircuitTransition { from, to }) = transition {
            self.events.record(ResilienceEvent::CircuitTransition {
                provider: breaker.provider().to_string(),
                from,
                to,
            });
        }
    }
}

fn provider_name(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::ExchangeRate => "exchange-api",
        MetricKind::FlightCost => "flight-api",
        MetricKind::CostOfLiving => "col-api",
        MetricKind::Safety | MetricKind::Visa | MetricKind::Accessibility => "static",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::breaker::CircuitState;
    use crate::ranking::events::test_support::RecordingSink;
    use crate::ranking::providers::{InMemoryCache, ProviderError};
    use crate::ranking::tests::common::destination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider whose first `failures` calls fail, then succeed with `value`.
    struct FlakyProvider {
        failures: usize,
        value: f64,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(failures: usize, value: f64) -> Self {
            Self {
                failures,
                value,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetricProvider for FlakyProvider {
        fn fetch(&self, _: &Destination, _: MetricKind) -> Result<f64, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ProviderError::Transport("connection reset".to_string()))
            } else {
                Ok(self.value)
            }
        }
    }

    fn resolver(
        provider: FlakyProvider,
        cooldown_seconds: i64,
    ) -> (
        MetricResolver<FlakyProvider, InMemoryCache>,
        Arc<FlakyProvider>,
        Arc<InMemoryCache>,
        Arc<RecordingSink>,
    ) {
        let provider = Arc::new(provider);
        let cache = Arc::new(InMemoryCache::default());
        let sink = Arc::new(RecordingSink::default());
        let resolver = MetricResolver::new(
            provider.clone(),
            cache.clone(),
            CacheTtls::default(),
            CircuitBreakerConfig {
                failure_threshold: 5,
                cooldown: Duration::seconds(cooldown_seconds),
            },
            sink.clone(),
        );
        (resolver, provider, cache, sink)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).expect("valid timestamp")
    }

    #[test]
    fn live_success_is_tagged_and_cached() {
        let (resolver, provider, cache, _) = resolver(FlakyProvider::new(0, 5.8), 60);
        let dest = destination("japan");

        let resolved = resolver.resolve(&dest, MetricKind::ExchangeRate, at(0));
        assert_eq!(resolved.provenance, Provenance::Live);
        assert_eq!(resolved.value, 5.8);
        assert_eq!(resolved.staleness, Duration::zero());
        assert_eq!(provider.calls(), 1);

        let cached = cache
            .get(&dest.key, MetricKind::ExchangeRate)
            .expect("live value cached");
        assert_eq!(cached.value, 5.8);
    }

    #[test]
    fn failure_falls_back_to_fresh_cache_then_baseline() {
        let (resolver, _, cache, _) = resolver(FlakyProvider::new(usize::MAX, 0.0), 60);
        let dest = destination("japan");

        // Fresh cache entry wins over baseline.
        cache.put(&dest.key, MetricKind::ExchangeRate, 4.6, at(0));
        let resolved = resolver.resolve(&dest, MetricKind::ExchangeRate, at(3600));
        assert_eq!(resolved.provenance, Provenance::Cache);
        assert_eq!(resolved.value, 4.6);
        assert_eq!(resolved.staleness, Duration::seconds(3600));

        // Beyond the 4h exchange TTL the entry no longer counts.
        let resolved = resolver.resolve(&dest, MetricKind::ExchangeRate, at(5 * 3600));
        assert_eq!(resolved.provenance, Provenance::Baseline);
        assert_eq!(resolved.value, dest.baselines.exchange_rate.value);
    }

    #[test]
    fn circuit_opens_after_threshold_and_short_circuits_during_cooldown() {
        let (resolver, provider, _, sink) = resolver(FlakyProvider::new(usize::MAX, 0.0), 60);
        let dest = destination("japan");

        for attempt in 0..5 {
            resolver.resolve(&dest, MetricKind::ExchangeRate, at(attempt));
        }
        assert_eq!(provider.calls(), 5);

        // Cooldown still running: the provider must not be invoked.
        let resolved = resolver.resolve(&dest, MetricKind::ExchangeRate, at(30));
        assert_eq!(resolved.provenance, Provenance::Baseline);
        assert_eq!(provider.calls(), 5);

        let transitions: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ResilienceEvent::CircuitTransition { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![(CircuitState::Closed, CircuitState::Open)]
        );
    }

    #[test]
    fn recovery_probe_closes_the_circuit_again() {
        let (resolver, provider, _, sink) = resolver(FlakyProvider::new(5, 5.1), 60);
        let dest = destination("japan");

        for attempt in 0..5 {
            resolver.resolve(&dest, MetricKind::ExchangeRate, at(attempt));
        }

        // Cooldown elapsed: the single probe succeeds and closes the circuit.
        let resolved = resolver.resolve(&dest, MetricKind::ExchangeRate, at(120));
        assert_eq!(resolved.provenance, Provenance::Live);
        assert_eq!(resolved.value, 5.1);
        assert_eq!(provider.calls(), 6);

        let closed = sink.events().into_iter().any(|event| {
            matches!(
                event,
                ResilienceEvent::CircuitTransition {
                    to: CircuitState::Closed,
                    ..
                }
            )
        });
        assert!(closed, "close transition must be reported");
    }

    #[test]
    fn breakers_are_independent_per_provider() {
        let (resolver, provider, _, _) = resolver(FlakyProvider::new(usize::MAX, 0.0), 60);
        let dest = destination("japan");

        for attempt in 0..5 {
            resolver.resolve(&dest, MetricKind::ExchangeRate, at(attempt));
        }

        // The flight provider's circuit is still closed and gets called.
        resolver.resolve(&dest, MetricKind::FlightCost, at(10));
        assert_eq!(provider.calls(), 6);

        let statuses = resolver.circuit_statuses();
        let exchange = statuses
            .iter()
            .find(|status| status.provider == "exchange-api")
            .expect("exchange breaker present");
        assert_eq!(exchange.state, CircuitState::Open);
        let flights = statuses
            .iter()
            .find(|status| status.provider == "flight-api")
            .expect("flight breaker present");
        assert_eq!(flights.state, CircuitState::Closed);
    }

    #[test]
    fn fallback_events_name_the_tier_used() {
        let (resolver, _, _, sink) = resolver(FlakyProvider::new(usize::MAX, 0.0), 60);
        let dest = destination("japan");

        resolver.resolve(&dest, MetricKind::FlightCost, at(0));
        let fallback_tiers: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ResilienceEvent::Fallback { tier, metric, .. } => Some((metric, tier)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fallback_tiers,
            vec![(MetricKind::FlightCost, Provenance::Baseline)]
        );
    }
}

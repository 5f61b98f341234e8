use tracing::{info, warn};

use crate::ranking::breaker::CircuitState;
use crate::ranking::domain::{Confidence, DestinationKey, MetricKind, Provenance};

/// Structured events the engine emits while resolving and scoring.
///
/// Fire-and-forget: sinks observe, they never influence scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResilienceEvent {
    CircuitTransition {
        provider: String,
        from: CircuitState,
        to: CircuitState,
    },
    Fallback {
        provider: String,
        destination: DestinationKey,
        metric: MetricKind,
        tier: Provenance,
    },
    QualitySummary {
        destination: DestinationKey,
        confidence: Confidence,
    },
}

/// Outbound observability boundary.
pub trait EventSink: Send + Sync {
    fn record(&self, event: ResilienceEvent);
}

/// Default sink routing events to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: ResilienceEvent) {
        match event {
            ResilienceEvent::CircuitTransition { provider, from, to } => {
                if to == CircuitState::Open {
                    warn!(%provider, from = from.label(), to = to.label(), "circuit opened");
                } else {
                    info!(%provider, from = from.label(), to = to.label(), "circuit transition");
                }
            }
            ResilienceEvent::Fallback {
                provider,
                destination,
                metric,
                tier,
            } => {
                info!(
                    %provider,
                    %destination,
                    metric = metric.label(),
                    tier = tier.label(),
                    "live value unavailable, using fallback"
                );
            }
            ResilienceEvent::QualitySummary {
                destination,
                confidence,
            } => {
                info!(%destination, ?confidence, "data quality summary");
            }
        }
    }
}

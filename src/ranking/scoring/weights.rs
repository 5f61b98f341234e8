use serde::{Deserialize, Serialize};

use crate::ranking::domain::MetricKind;

/// Weight applied to each metric in the composite blend.
///
/// Unknown metric keys in a catalog file are rejected outright rather than
/// silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    pub exchange_rate: f64,
    pub flight_cost: f64,
    pub cost_of_living: f64,
    pub safety: f64,
    pub visa: f64,
    pub accessibility: f64,
}

/// Tolerance for the convex-combination check.
const WEIGHT_EPSILON: f64 = 1e-6;

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exchange_rate: 0.20,
            flight_cost: 0.15,
            cost_of_living: 0.35,
            safety: 0.15,
            visa: 0.10,
            accessibility: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn for_metric(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::ExchangeRate => self.exchange_rate,
            MetricKind::FlightCost => self.flight_cost,
            MetricKind::CostOfLiving => self.cost_of_living,
            MetricKind::Safety => self.safety,
            MetricKind::Visa => self.visa,
            MetricKind::Accessibility => self.accessibility,
        }
    }

    fn sum(&self) -> f64 {
        self.exchange_rate
            + self.flight_cost
            + self.cost_of_living
            + self.safety
            + self.visa
            + self.accessibility
    }

    /// Weights must form a convex combination. Violations are a startup
    /// defect, never a per-request condition.
    pub fn validate(&self) -> Result<(), WeightError> {
        let entries = [
            (MetricKind::ExchangeRate, self.exchange_rate),
            (MetricKind::FlightCost, self.flight_cost),
            (MetricKind::CostOfLiving, self.cost_of_living),
            (MetricKind::Safety, self.safety),
            (MetricKind::Visa, self.visa),
            (MetricKind::Accessibility, self.accessibility),
        ];
        for (metric, weight) in entries {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(WeightError::OutOfRange { metric, weight });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(WeightError::Sum { sum });
        }
        Ok(())
    }
}

/// Weight misconfiguration detected while loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum WeightError {
    #[error("metric weights sum to {sum}, expected 1.0")]
    Sum { sum: f64 },
    #[error("weight {weight} for {} is outside [0, 1]", .metric.label())]
    OutOfRange { metric: MetricKind, weight: f64 },
}

//! Composite scoring: blends normalized sub-scores into a final 0-100 score
//! with badges and an overall momentum figure.

mod badges;
pub mod normalize;
mod weights;

pub use weights::{ScoringWeights, WeightError};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::ranking::domain::{
    round1, DataQualitySummary, Destination, DestinationScoreResult, MetricKind, ResolvedMetric,
    SubScore,
};

/// Pure scoring engine over already-resolved inputs.
///
/// Construction validates the weights; after that no call path can fail.
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Result<Self, WeightError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Normalize each resolved market metric and attach the destination's
    /// static sub-scores.
    pub fn sub_scores(
        &self,
        destination: &Destination,
        resolved: &[ResolvedMetric],
    ) -> BTreeMap<MetricKind, SubScore> {
        let mut sub_scores = BTreeMap::new();

        for metric in resolved {
            let baseline = destination
                .baselines
                .market_value(metric.metric)
                .map(|baseline| baseline.value);
            sub_scores.insert(
                metric.metric,
                normalize::normalize_market(metric.metric, metric.value, baseline),
            );
        }

        sub_scores.insert(MetricKind::Visa, normalize::visa_sub_score(destination.visa));
        sub_scores.insert(
            MetricKind::Safety,
            normalize::static_sub_score(destination.safety.composite()),
        );
        sub_scores.insert(
            MetricKind::Accessibility,
            normalize::static_sub_score(destination.accessibility.composite()),
        );

        sub_scores
    }

    /// Blend sub-scores into the final result. Computation runs at full
    /// precision; rounding to one decimal happens only here, at the output
    /// boundary.
    pub fn score(
        &self,
        destination: &Destination,
        sub_scores: BTreeMap<MetricKind, SubScore>,
        data_quality: DataQualitySummary,
        evaluated_at: DateTime<Utc>,
    ) -> DestinationScoreResult {
        let mut final_score = 0.0;
        let mut overall_change_pct = 0.0;

        for (metric, sub) in &sub_scores {
            let weight = self.weights.for_metric(*metric);
            final_score += weight * sub.blended;
            // Metrics without a momentum term contribute zero to the
            // overall change.
            overall_change_pct += weight * sub.change_pct.unwrap_or(0.0);
        }

        let badges = badges::assign_badges(
            final_score,
            overall_change_pct,
            &sub_scores,
            destination.visa,
        );

        let sub_scores = sub_scores
            .into_iter()
            .map(|(metric, sub)| {
                (
                    metric,
                    SubScore {
                        absolute: sub.absolute.map(round1),
                        momentum: sub.momentum.map(round1),
                        change_pct: sub.change_pct.map(round1),
                        blended: round1(sub.blended),
                        trend: sub.trend,
                    },
                )
            })
            .collect();

        DestinationScoreResult {
            key: destination.key.clone(),
            name: destination.name.clone(),
            final_score: round1(final_score),
            overall_change_pct: round1(overall_change_pct),
            sub_scores,
            badges,
            data_quality,
            evaluated_at,
        }
    }
}

//! Provenance aggregation over one destination's resolved market metrics.

use chrono::Duration;

use crate::ranking::domain::{Confidence, DataQualitySummary, Provenance, ResolvedMetric};

/// Default cache age below which a cached value still counts as fresh.
pub fn default_fresh_after() -> Duration {
    Duration::hours(1)
}

/// Summarize how a destination's market metrics were sourced.
///
/// Pure over its inputs: the same resolved set always yields the same
/// summary. Static catalog inputs are not part of the tally.
pub fn summarize(resolved: &[ResolvedMetric], fresh_after: Duration) -> DataQualitySummary {
    let mut live = 0;
    let mut cache = 0;
    let mut baseline = 0;
    let mut stale_cache = false;

    for metric in resolved {
        match metric.provenance {
            Provenance::Live => live += 1,
            Provenance::Cache => {
                cache += 1;
                if metric.staleness > fresh_after {
                    stale_cache = true;
                }
            }
            Provenance::Baseline => baseline += 1,
        }
    }

    let confidence = if baseline > 0 {
        Confidence::Low
    } else if stale_cache {
        Confidence::Medium
    } else {
        Confidence::High
    };

    DataQualitySummary {
        live,
        cache,
        baseline,
        confidence,
    }
}

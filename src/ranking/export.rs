//! CSV export of a ranking cycle's results.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::ranking::domain::{DestinationScoreResult, MetricKind};

/// Flat per-destination row; one per ranked result, in ranking order.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    rank: usize,
    key: &'a str,
    name: &'a str,
    final_score: f64,
    overall_change_pct: f64,
    exchange_rate: Option<f64>,
    flight_cost: Option<f64>,
    cost_of_living: Option<f64>,
    safety: Option<f64>,
    visa: Option<f64>,
    accessibility: Option<f64>,
    confidence: String,
    badges: String,
}

/// Failure to write the export document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export file {path}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize export row")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export output")]
    Flush(#[source] std::io::Error),
}

pub fn export_csv_to_path(
    results: &[DestinationScoreResult],
    path: &Path,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    export_csv(results, file)
}

pub fn export_csv<W: Write>(
    results: &[DestinationScoreResult],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (index, result) in results.iter().enumerate() {
        let blended = |metric: MetricKind| {
            result.sub_scores.get(&metric).map(|sub| sub.blended)
        };
        let badges = result
            .badges
            .iter()
            .map(|badge| badge.label())
            .collect::<Vec<_>>()
            .join("|");
        csv_writer.serialize(ExportRow {
            rank: index + 1,
            key: &result.key.0,
            name: &result.name,
            final_score: result.final_score,
            overall_change_pct: result.overall_change_pct,
            exchange_rate: blended(MetricKind::ExchangeRate),
            flight_cost: blended(MetricKind::FlightCost),
            cost_of_living: blended(MetricKind::CostOfLiving),
            safety: blended(MetricKind::Safety),
            visa: blended(MetricKind::Visa),
            accessibility: blended(MetricKind::Accessibility),
            confidence: format!("{:?}", result.data_quality.confidence).to_lowercase(),
            badges,
        })?;
    }
    csv_writer.flush().map_err(ExportError::Flush)?;
    Ok(())
}

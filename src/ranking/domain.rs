use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for a destination, unique within the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DestinationKey(pub String);

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DestinationKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The metrics contributing to a destination's composite score.
///
/// The first three are market metrics with live providers; the rest are
/// pre-resolved static inputs carried by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    ExchangeRate,
    FlightCost,
    CostOfLiving,
    Safety,
    Visa,
    Accessibility,
}

impl MetricKind {
    /// Metrics resolved through the resilience wrapper each cycle.
    pub const MARKET: [MetricKind; 3] = [
        MetricKind::ExchangeRate,
        MetricKind::FlightCost,
        MetricKind::CostOfLiving,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::ExchangeRate => "exchange rate",
            MetricKind::FlightCost => "flight cost",
            MetricKind::CostOfLiving => "cost of living",
            MetricKind::Safety => "safety",
            MetricKind::Visa => "visa",
            MetricKind::Accessibility => "accessibility",
        }
    }
}

/// Visa regime the destination applies to the traveler's passport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisaCategory {
    VisaFree,
    VisaOnArrival,
    EVisa,
    Required,
}

impl VisaCategory {
    /// Fixed categorical score; no momentum term exists for visa ease.
    pub fn score(self) -> f64 {
        match self {
            VisaCategory::VisaFree => 100.0,
            VisaCategory::VisaOnArrival => 80.0,
            VisaCategory::EVisa => 60.0,
            VisaCategory::Required => 20.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VisaCategory::VisaFree => "visa-free",
            VisaCategory::VisaOnArrival => "visa on arrival",
            VisaCategory::EVisa => "e-visa",
            VisaCategory::Required => "visa required",
        }
    }
}

/// Pre-blended static indicator built from two index sources (50/50).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticIndicator {
    /// Primary index source, 0-100.
    pub primary: f64,
    /// Secondary index source, 0-100.
    pub secondary: f64,
}

impl StaticIndicator {
    pub fn composite(&self) -> f64 {
        ((self.primary + self.secondary) / 2.0).clamp(0.0, 100.0)
    }
}

/// Long-run reference value for one market metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub value: f64,
    pub methodology: String,
    pub calculated_on: NaiveDate,
    pub source: String,
}

/// Baselines for the three market metrics of one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSet {
    pub exchange_rate: Baseline,
    pub flight_cost: Baseline,
    pub monthly_col: Baseline,
}

impl BaselineSet {
    /// Baseline for a market metric. Static metrics carry no baseline.
    pub fn market_value(&self, metric: MetricKind) -> Option<&Baseline> {
        match metric {
            MetricKind::ExchangeRate => Some(&self.exchange_rate),
            MetricKind::FlightCost => Some(&self.flight_cost),
            MetricKind::CostOfLiving => Some(&self.monthly_col),
            MetricKind::Safety | MetricKind::Visa | MetricKind::Accessibility => None,
        }
    }
}

/// Static identity of a destination; immutable once the catalog loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(skip)]
    pub key: DestinationKey,
    pub name: String,
    pub region: String,
    pub currency: String,
    pub airport: String,
    pub visa: VisaCategory,
    pub safety: StaticIndicator,
    pub accessibility: StaticIndicator,
    pub baselines: BaselineSet,
}

/// Source tier a resolved metric value came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Cache,
    Baseline,
}

impl Provenance {
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Cache => "cache",
            Provenance::Baseline => "baseline",
        }
    }
}

/// A market metric value resolved for one scoring cycle, stamped with its
/// source tier and freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMetric {
    pub metric: MetricKind,
    pub value: f64,
    pub provenance: Provenance,
    pub resolved_at: DateTime<Utc>,
    pub staleness: Duration,
}

/// Trend classification derived from a metric's percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    StrongPositive,
    Positive,
    Stable,
    Negative,
    StrongNegative,
}

impl TrendLabel {
    pub fn arrow(self) -> &'static str {
        match self {
            TrendLabel::StrongPositive => "++",
            TrendLabel::Positive => "+",
            TrendLabel::Stable => "=",
            TrendLabel::Negative => "-",
            TrendLabel::StrongNegative => "--",
        }
    }
}

/// Normalized per-metric scores, recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub absolute: Option<f64>,
    pub momentum: Option<f64>,
    pub change_pct: Option<f64>,
    pub blended: f64,
    pub trend: TrendLabel,
}

/// Boolean-triggered labels surfaced alongside a score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    Excellent,
    HotDeal,
    CurrencyWin,
    FlightDeal,
    Deflation,
    SafeHaven,
    EasyEntry,
    WellConnected,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::Excellent => "EXCELLENT",
            Badge::HotDeal => "HOT DEAL",
            Badge::CurrencyWin => "CURRENCY WIN",
            Badge::FlightDeal => "FLIGHT DEAL",
            Badge::Deflation => "DEFLATION",
            Badge::SafeHaven => "SAFE HAVEN",
            Badge::EasyEntry => "EASY ENTRY",
            Badge::WellConnected => "WELL CONNECTED",
        }
    }
}

/// Confidence label summarizing how a destination's data was sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Counts of resolved market metrics by provenance tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualitySummary {
    pub live: usize,
    pub cache: usize,
    pub baseline: usize,
    pub confidence: Confidence,
}

/// The engine's sole output contract, one per destination per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationScoreResult {
    pub key: DestinationKey,
    pub name: String,
    pub final_score: f64,
    pub overall_change_pct: f64,
    pub sub_scores: BTreeMap<MetricKind, SubScore>,
    pub badges: BTreeSet<Badge>,
    pub data_quality: DataQualitySummary,
    pub evaluated_at: DateTime<Utc>,
}

/// Round to one decimal place at the output boundary.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visa_categories_map_to_fixed_scores() {
        assert_eq!(VisaCategory::VisaFree.score(), 100.0);
        assert_eq!(VisaCategory::VisaOnArrival.score(), 80.0);
        assert_eq!(VisaCategory::EVisa.score(), 60.0);
        assert_eq!(VisaCategory::Required.score(), 20.0);
    }

    #[test]
    fn static_indicator_blends_sources_evenly() {
        let indicator = StaticIndicator {
            primary: 90.0,
            secondary: 70.0,
        };
        assert_eq!(indicator.composite(), 80.0);
    }

    #[test]
    fn static_indicator_composite_is_clipped() {
        let indicator = StaticIndicator {
            primary: 130.0,
            secondary: 110.0,
        };
        assert_eq!(indicator.composite(), 100.0);
    }

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_eq!(round1(1.25), 1.3);
        assert_eq!(round1(38.095_238), 38.1);
    }
}

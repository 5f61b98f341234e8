//! Momentum/absolute normalization of raw metric values into 0-100
//! sub-scores.
//!
//! Each metric kind maps to a closed formula variant carrying its own
//! parameters as data, so normalization is one exhaustive match rather than
//! a free-form table of coefficients.

use tracing::warn;

use crate::ranking::domain::{MetricKind, SubScore, TrendLabel, VisaCategory};

/// Momentum term parameters: `clip((change_pct + offset) * scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumCurve {
    pub offset: f64,
    pub scale: f64,
    /// When set, a drop below baseline counts as positive change
    /// (cheaper-than-baseline is an improvement).
    pub favors_decline: bool,
}

impl MomentumCurve {
    fn change_pct(&self, raw: f64, baseline: f64) -> f64 {
        if self.favors_decline {
            (baseline - raw) / baseline * 100.0
        } else {
            (raw - baseline) / baseline * 100.0
        }
    }

    fn score(&self, change_pct: f64) -> f64 {
        clip((change_pct + self.offset) * self.scale)
    }

    /// Score at zero change, used when the baseline is unusable.
    fn neutral(&self) -> f64 {
        self.score(0.0)
    }
}

/// Absolute term parameters: position within a fixed plausible range,
/// inverted so a lower raw value scores higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteRange {
    pub min: f64,
    pub max: f64,
}

impl AbsoluteRange {
    fn score(&self, raw: f64) -> f64 {
        clip(100.0 - (raw - self.min) / (self.max - self.min) * 100.0)
    }
}

/// Formula assigned to a metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formula {
    /// Momentum only (exchange rate).
    PureMomentum(MomentumCurve),
    /// Momentum-weighted hybrid (flight cost).
    Hybrid {
        momentum: MomentumCurve,
        range: AbsoluteRange,
        momentum_share: f64,
    },
    /// Categorical lookup (visa), handled outside `normalize_market`.
    Categorical,
    /// Pre-blended static score passed through (safety, accessibility).
    CompositeStatic,
}

/// Thresholds for trend classification, in percentage points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendBands {
    pub strong: f64,
    pub mild: f64,
}

impl TrendBands {
    pub fn classify(&self, change_pct: f64) -> TrendLabel {
        if change_pct > self.strong {
            TrendLabel::StrongPositive
        } else if change_pct > self.mild {
            TrendLabel::Positive
        } else if change_pct > -self.mild {
            TrendLabel::Stable
        } else if change_pct > -self.strong {
            TrendLabel::Negative
        } else {
            TrendLabel::StrongNegative
        }
    }
}

const GENERIC_BANDS: TrendBands = TrendBands {
    strong: 15.0,
    mild: 5.0,
};

const COL_BANDS: TrendBands = TrendBands {
    strong: 10.0,
    mild: 3.0,
};

/// Formula and trend bands for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub formula: Formula,
    pub trend: TrendBands,
}

pub fn metric_spec(metric: MetricKind) -> MetricSpec {
    match metric {
        MetricKind::ExchangeRate => MetricSpec {
            // -50% -> 0, 0% -> 50, +50% -> 100.
            formula: Formula::PureMomentum(MomentumCurve {
                offset: 50.0,
                scale: 1.0,
                favors_decline: false,
            }),
            trend: GENERIC_BANDS,
        },
        MetricKind::FlightCost => MetricSpec {
            formula: Formula::Hybrid {
                momentum: MomentumCurve {
                    offset: 30.0,
                    scale: 1.667,
                    favors_decline: true,
                },
                range: AbsoluteRange {
                    min: 3_000.0,
                    max: 50_000.0,
                },
                momentum_share: 0.70,
            },
            trend: GENERIC_BANDS,
        },
        MetricKind::CostOfLiving => MetricSpec {
            formula: Formula::Hybrid {
                momentum: MomentumCurve {
                    offset: 20.0,
                    scale: 2.5,
                    favors_decline: true,
                },
                range: AbsoluteRange {
                    min: 500.0,
                    max: 4_000.0,
                },
                momentum_share: 0.20,
            },
            trend: COL_BANDS,
        },
        MetricKind::Visa => MetricSpec {
            formula: Formula::Categorical,
            trend: GENERIC_BANDS,
        },
        MetricKind::Safety | MetricKind::Accessibility => MetricSpec {
            formula: Formula::CompositeStatic,
            trend: GENERIC_BANDS,
        },
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Normalize a market metric's raw value against its baseline.
///
/// A missing or non-positive baseline leaves the momentum term undefined;
/// the change is substituted with 0 (neutral) and a data-quality warning is
/// emitted so the cycle always completes.
pub fn normalize_market(metric: MetricKind, raw: f64, baseline: Option<f64>) -> SubScore {
    let spec = metric_spec(metric);

    let usable_baseline = match baseline {
        Some(value) if value > 0.0 && value.is_finite() => Some(value),
        _ => {
            warn!(
                metric = metric.label(),
                ?baseline,
                "baseline missing or unusable, substituting neutral momentum"
            );
            None
        }
    };

    match spec.formula {
        Formula::PureMomentum(momentum) => {
            let change_pct = usable_baseline
                .map(|base| momentum.change_pct(raw, base))
                .unwrap_or(0.0);
            let score = if usable_baseline.is_some() {
                momentum.score(change_pct)
            } else {
                momentum.neutral()
            };
            SubScore {
                absolute: None,
                momentum: Some(score),
                change_pct: Some(change_pct),
                blended: score,
                trend: spec.trend.classify(change_pct),
            }
        }
        Formula::Hybrid {
            momentum,
            range,
            momentum_share,
        } => {
            let change_pct = usable_baseline
                .map(|base| momentum.change_pct(raw, base))
                .unwrap_or(0.0);
            let momentum_score = if usable_baseline.is_some() {
                momentum.score(change_pct)
            } else {
                momentum.neutral()
            };
            let absolute_score = range.score(raw);
            let blended =
                momentum_score * momentum_share + absolute_score * (1.0 - momentum_share);
            SubScore {
                absolute: Some(absolute_score),
                momentum: Some(momentum_score),
                change_pct: Some(change_pct),
                blended,
                trend: spec.trend.classify(change_pct),
            }
        }
        // Static metrics never reach the market normalizer.
        Formula::Categorical | Formula::CompositeStatic => SubScore {
            absolute: Some(clip(raw)),
            momentum: None,
            change_pct: None,
            blended: clip(raw),
            trend: TrendLabel::Stable,
        },
    }
}

/// Sub-score for the categorical visa metric.
pub fn visa_sub_score(category: VisaCategory) -> SubScore {
    let score = category.score();
    SubScore {
        absolute: Some(score),
        momentum: None,
        change_pct: None,
        blended: score,
        trend: TrendLabel::Stable,
    }
}

/// Sub-score for a pre-blended static indicator (safety, accessibility).
pub fn static_sub_score(composite: f64) -> SubScore {
    let score = clip(composite);
    SubScore {
        absolute: Some(score),
        momentum: None,
        change_pct: None,
        blended: score,
        trend: TrendLabel::Stable,
    }
}

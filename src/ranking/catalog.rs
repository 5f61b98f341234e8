//! Destination catalog: the static inputs to every scoring cycle.
//!
//! Loaded once at startup and validated eagerly; any defect here is a
//! configuration error and fatal, unlike runtime provider failures.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::ranking::domain::{Destination, DestinationKey, MetricKind};
use crate::ranking::scoring::{ScoringWeights, WeightError};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    weights: ScoringWeights,
    destinations: BTreeMap<String, Destination>,
}

/// Validated catalog of destinations plus the scoring weights.
#[derive(Debug, Clone)]
pub struct DestinationCatalog {
    weights: ScoringWeights,
    destinations: BTreeMap<DestinationKey, Destination>,
}

impl DestinationCatalog {
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let mut raw = String::new();
        File::open(path)
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?
            .read_to_string(&mut raw)
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        if file.destinations.is_empty() {
            return Err(CatalogError::Empty);
        }
        file.weights.validate()?;

        let mut destinations = BTreeMap::new();
        for (key, mut destination) in file.destinations {
            let key = DestinationKey(key);
            destination.key = key.clone();
            validate_destination(&destination)?;
            destinations.insert(key, destination);
        }

        Ok(Self {
            weights: file.weights,
            destinations,
        })
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn get(&self, key: &DestinationKey) -> Option<&Destination> {
        self.destinations.get(key)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.values()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

fn validate_destination(destination: &Destination) -> Result<(), CatalogError> {
    for metric in MetricKind::MARKET {
        let baseline = destination
            .baselines
            .market_value(metric)
            .ok_or_else(|| baseline_error(destination, metric))?;
        if !baseline.value.is_finite() || baseline.value <= 0.0 {
            return Err(baseline_error(destination, metric));
        }
    }
    for (label, indicator) in [
        ("safety", &destination.safety),
        ("accessibility", &destination.accessibility),
    ] {
        for value in [indicator.primary, indicator.secondary] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(CatalogError::Indicator {
                    destination: destination.key.clone(),
                    indicator: label,
                    value,
                });
            }
        }
    }
    Ok(())
}

fn baseline_error(destination: &Destination, metric: MetricKind) -> CatalogError {
    CatalogError::Baseline {
        destination: destination.key.clone(),
        metric,
    }
}

/// Defects in the catalog document. All fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog file")]
    Parse(#[from] serde_json::Error),
    #[error("catalog defines no destinations")]
    Empty,
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error("destination {destination} has a missing or non-positive {} baseline", .metric.label())]
    Baseline {
        destination: DestinationKey,
        metric: MetricKind,
    },
    #[error("destination {destination} has an out-of-range {indicator} index ({value})")]
    Indicator {
        destination: DestinationKey,
        indicator: &'static str,
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::domain::VisaCategory;

    fn entry(exchange_baseline: f64) -> String {
        format!(
            r#"{{
                "name": "Japan",
                "region": "East Asia",
                "currency": "JPY",
                "airport": "NRT",
                "visa": "visa_free",
                "safety": {{ "primary": 90.0, "secondary": 82.0 }},
                "accessibility": {{ "primary": 92.0, "secondary": 84.0 }},
                "baselines": {{
                    "exchange_rate": {{
                        "value": {exchange_baseline},
                        "methodology": "3y average",
                        "calculated_on": "2026-01-01",
                        "source": "test"
                    }},
                    "flight_cost": {{
                        "value": 12000.0,
                        "methodology": "3y average",
                        "calculated_on": "2026-01-01",
                        "source": "test"
                    }},
                    "monthly_col": {{
                        "value": 1600.0,
                        "methodology": "3y average",
                        "calculated_on": "2026-01-01",
                        "source": "test"
                    }}
                }}
            }}"#
        )
    }

    #[test]
    fn load_assigns_keys_and_default_weights() {
        let raw = format!(r#"{{ "destinations": {{ "japan": {} }} }}"#, entry(4.2));
        let catalog = DestinationCatalog::from_json(&raw).expect("valid catalog");

        assert_eq!(catalog.len(), 1);
        let destination = catalog.get(&"japan".into()).expect("destination present");
        assert_eq!(destination.key, "japan".into());
        assert_eq!(destination.visa, VisaCategory::VisaFree);
        assert_eq!(catalog.weights(), ScoringWeights::default());
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let raw = r#"{ "destinations": {} }"#;
        assert!(matches!(
            DestinationCatalog::from_json(raw),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn non_positive_baseline_is_rejected() {
        let raw = format!(r#"{{ "destinations": {{ "japan": {} }} }}"#, entry(0.0));
        assert!(matches!(
            DestinationCatalog::from_json(&raw),
            Err(CatalogError::Baseline {
                metric: MetricKind::ExchangeRate,
                ..
            })
        ));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let raw = format!(
            r#"{{
                "weights": {{
                    "exchange_rate": 0.5, "flight_cost": 0.5, "cost_of_living": 0.5,
                    "safety": 0.15, "visa": 0.10, "accessibility": 0.05
                }},
                "destinations": {{ "japan": {} }}
            }}"#,
            entry(4.2)
        );
        assert!(matches!(
            DestinationCatalog::from_json(&raw),
            Err(CatalogError::Weights(_))
        ));
    }

    #[test]
    fn out_of_range_indicator_is_rejected() {
        let raw = format!(r#"{{ "destinations": {{ "japan": {} }} }}"#, entry(4.2))
            .replace(r#""primary": 90.0"#, r#""primary": 130.0"#);
        assert!(matches!(
            DestinationCatalog::from_json(&raw),
            Err(CatalogError::Indicator {
                indicator: "safety",
                ..
            })
        ));
    }
}

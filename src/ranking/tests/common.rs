use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use crate::ranking::breaker::CircuitBreakerConfig;
use crate::ranking::catalog::DestinationCatalog;
use crate::ranking::domain::{
    Baseline, BaselineSet, Destination, MetricKind, StaticIndicator, VisaCategory,
};
use crate::ranking::events::test_support::RecordingSink;
use crate::ranking::history::InMemoryHistoryStore;
use crate::ranking::providers::{InMemoryCache, MetricProvider, ProviderError};
use crate::ranking::providers::CacheTtls;
use crate::ranking::resolver::MetricResolver;
use crate::ranking::service::RankingService;

pub(crate) fn baseline(value: f64) -> Baseline {
    Baseline {
        value,
        methodology: "3y average".to_string(),
        calculated_on: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        source: "fixture".to_string(),
    }
}

/// Fixture destinations covering the catalog shapes the tests rely on.
pub(crate) fn destination(key: &str) -> Destination {
    match key {
        "japan" => Destination {
            key: key.into(),
            name: "Japan".to_string(),
            region: "East Asia".to_string(),
            currency: "JPY".to_string(),
            airport: "NRT".to_string(),
            visa: VisaCategory::VisaFree,
            safety: StaticIndicator {
                primary: 90.0,
                secondary: 82.0,
            },
            accessibility: StaticIndicator {
                primary: 92.0,
                secondary: 84.0,
            },
            baselines: BaselineSet {
                exchange_rate: baseline(4.2),
                flight_cost: baseline(12_000.0),
                monthly_col: baseline(1_600.0),
            },
        },
        "thailand" => Destination {
            key: key.into(),
            name: "Thailand".to_string(),
            region: "Southeast Asia".to_string(),
            currency: "THB".to_string(),
            airport: "BKK".to_string(),
            visa: VisaCategory::VisaOnArrival,
            safety: StaticIndicator {
                primary: 70.0,
                secondary: 64.0,
            },
            accessibility: StaticIndicator {
                primary: 78.0,
                secondary: 70.0,
            },
            baselines: BaselineSet {
                exchange_rate: baseline(1.05),
                flight_cost: baseline(9_000.0),
                monthly_col: baseline(800.0),
            },
        },
        other => Destination {
            key: other.into(),
            name: other.to_string(),
            region: "Fixture".to_string(),
            currency: "USD".to_string(),
            airport: "XXX".to_string(),
            visa: VisaCategory::EVisa,
            safety: StaticIndicator {
                primary: 60.0,
                secondary: 60.0,
            },
            accessibility: StaticIndicator {
                primary: 60.0,
                secondary: 60.0,
            },
            baselines: BaselineSet {
                exchange_rate: baseline(1.0),
                flight_cost: baseline(10_000.0),
                monthly_col: baseline(1_200.0),
            },
        },
    }
}

pub(crate) fn catalog_json() -> String {
    let japan = destination_json("Japan", "East Asia", "JPY", "NRT", "visa_free", 90.0, 82.0, 92.0, 84.0, 4.2, 12_000.0, 1_600.0);
    let thailand = destination_json("Thailand", "Southeast Asia", "THB", "BKK", "visa_on_arrival", 70.0, 64.0, 78.0, 70.0, 1.05, 9_000.0, 800.0);
    format!(r#"{{ "destinations": {{ "japan": {japan}, "thailand": {thailand} }} }}"#)
}

#[allow(clippy::too_many_arguments)]
fn destination_json(
    name: &str,
    region: &str,
    currency: &str,
    airport: &str,
    visa: &str,
    safety_primary: f64,
    safety_secondary: f64,
    access_primary: f64,
    access_secondary: f64,
    exchange: f64,
    flight: f64,
    col: f64,
) -> String {
    format!(
        r#"{{
            "name": "{name}",
            "region": "{region}",
            "currency": "{currency}",
            "airport": "{airport}",
            "visa": "{visa}",
            "safety": {{ "primary": {safety_primary}, "secondary": {safety_secondary} }},
            "accessibility": {{ "primary": {access_primary}, "secondary": {access_secondary} }},
            "baselines": {{
                "exchange_rate": {{
                    "value": {exchange},
                    "methodology": "3y average",
                    "calculated_on": "2026-01-01",
                    "source": "fixture"
                }},
                "flight_cost": {{
                    "value": {flight},
                    "methodology": "3y average",
                    "calculated_on": "2026-01-01",
                    "source": "fixture"
                }},
                "monthly_col": {{
                    "value": {col},
                    "methodology": "3y average",
                    "calculated_on": "2026-01-01",
                    "source": "fixture"
                }}
            }}
        }}"#
    )
}

pub(crate) fn catalog() -> Arc<DestinationCatalog> {
    Arc::new(DestinationCatalog::from_json(&catalog_json()).expect("valid fixture catalog"))
}

/// Provider scripted per (destination, metric); unscripted pairs fail like a
/// broken upstream.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProvider {
    quotes: Mutex<HashMap<(String, MetricKind), f64>>,
}

impl ScriptedProvider {
    pub(crate) fn quote(&self, destination: &str, metric: MetricKind, value: f64) {
        self.quotes
            .lock()
            .expect("quotes mutex poisoned")
            .insert((destination.to_string(), metric), value);
    }
}

impl MetricProvider for ScriptedProvider {
    fn fetch(&self, destination: &Destination, metric: MetricKind) -> Result<f64, ProviderError> {
        self.quotes
            .lock()
            .expect("quotes mutex poisoned")
            .get(&(destination.key.0.clone(), metric))
            .copied()
            .ok_or_else(|| ProviderError::Transport("no quote scripted".to_string()))
    }
}

/// Provider that always fails, for resilience paths.
#[derive(Debug, Default)]
pub(crate) struct UnavailableProvider;

impl MetricProvider for UnavailableProvider {
    fn fetch(&self, _: &Destination, _: MetricKind) -> Result<f64, ProviderError> {
        Err(ProviderError::Timeout(10))
    }
}

pub(crate) struct ServiceHarness<P> {
    pub(crate) service: Arc<RankingService<P, InMemoryCache, InMemoryHistoryStore>>,
    pub(crate) cache: Arc<InMemoryCache>,
    pub(crate) history: Arc<InMemoryHistoryStore>,
    pub(crate) sink: Arc<RecordingSink>,
}

pub(crate) fn harness<P: MetricProvider + 'static>(provider: P) -> ServiceHarness<P> {
    let cache = Arc::new(InMemoryCache::default());
    let history = Arc::new(InMemoryHistoryStore::default());
    let sink = Arc::new(RecordingSink::default());
    let resolver = Arc::new(MetricResolver::new(
        Arc::new(provider),
        cache.clone(),
        CacheTtls::default(),
        CircuitBreakerConfig::default(),
        sink.clone(),
    ));
    let service = Arc::new(
        RankingService::new(catalog(), resolver, history.clone(), sink.clone())
            .expect("fixture weights are valid"),
    );
    ServiceHarness {
        service,
        cache,
        history,
        sink,
    }
}

pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + seconds, 0).expect("valid timestamp")
}

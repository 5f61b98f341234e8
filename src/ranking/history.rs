//! Daily score history, one snapshot per destination per date.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ranking::domain::{Badge, DestinationKey, DestinationScoreResult, MetricKind};

/// One recorded scoring outcome, keyed by (destination, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub destination: DestinationKey,
    pub date: NaiveDate,
    /// Raw market metric values that fed the cycle.
    pub raw_values: BTreeMap<MetricKind, f64>,
    pub final_score: f64,
    pub overall_change_pct: f64,
    pub badges: BTreeSet<Badge>,
}

impl HistorySnapshot {
    /// Snapshot a cycle's outcome for its evaluation date.
    pub fn from_result(
        result: &DestinationScoreResult,
        raw_values: BTreeMap<MetricKind, f64>,
    ) -> Self {
        Self {
            destination: result.key.clone(),
            date: result.evaluated_at.date_naive(),
            raw_values,
            final_score: result.final_score,
            overall_change_pct: result.overall_change_pct,
            badges: result.badges.clone(),
        }
    }
}

/// Persistence boundary for score history.
pub trait HistoryStore: Send + Sync {
    /// Insert or replace the snapshot for (destination, date). Re-running a
    /// cycle on the same date overwrites rather than duplicates.
    fn upsert(&self, snapshot: HistorySnapshot) -> Result<(), HistoryError>;

    /// Snapshots for one destination from `since` onwards, ascending by date.
    fn query(
        &self,
        destination: &DestinationKey,
        since: NaiveDate,
    ) -> Result<Vec<HistorySnapshot>, HistoryError>;
}

/// Failure inside a history store. Never fatal to a scoring cycle.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local history store backing the binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    rows: Mutex<BTreeMap<(DestinationKey, NaiveDate), HistorySnapshot>>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn upsert(&self, snapshot: HistorySnapshot) -> Result<(), HistoryError> {
        let key = (snapshot.destination.clone(), snapshot.date);
        self.rows
            .lock()
            .expect("history mutex poisoned")
            .insert(key, snapshot);
        Ok(())
    }

    fn query(
        &self,
        destination: &DestinationKey,
        since: NaiveDate,
    ) -> Result<Vec<HistorySnapshot>, HistoryError> {
        let rows = self.rows.lock().expect("history mutex poisoned");
        Ok(rows
            .range((destination.clone(), since)..)
            .take_while(|((key, _), _)| key == destination)
            .map(|(_, snapshot)| snapshot.clone())
            .collect())
    }
}

use std::collections::{BTreeMap, BTreeSet};

use crate::ranking::domain::{Badge, MetricKind, SubScore, VisaCategory};

const EXCELLENT_THRESHOLD: f64 = 85.0;
const HOT_DEAL_THRESHOLD: f64 = 15.0;
const CURRENCY_WIN_THRESHOLD: f64 = 20.0;
const FLIGHT_DEAL_THRESHOLD: f64 = 25.0;
const DEFLATION_THRESHOLD: f64 = 15.0;
const SAFE_HAVEN_THRESHOLD: f64 = 85.0;
const WELL_CONNECTED_THRESHOLD: f64 = 80.0;

fn change_for(sub_scores: &BTreeMap<MetricKind, SubScore>, metric: MetricKind) -> f64 {
    sub_scores
        .get(&metric)
        .and_then(|sub| sub.change_pct)
        .unwrap_or(0.0)
}

fn blended_for(sub_scores: &BTreeMap<MetricKind, SubScore>, metric: MetricKind) -> f64 {
    sub_scores.get(&metric).map(|sub| sub.blended).unwrap_or(0.0)
}

/// Evaluate every badge rule independently; a result may carry zero or many.
pub fn assign_badges(
    final_score: f64,
    overall_change_pct: f64,
    sub_scores: &BTreeMap<MetricKind, SubScore>,
    visa: VisaCategory,
) -> BTreeSet<Badge> {
    let mut badges = BTreeSet::new();

    if final_score >= EXCELLENT_THRESHOLD {
        badges.insert(Badge::Excellent);
    }
    if overall_change_pct > HOT_DEAL_THRESHOLD {
        badges.insert(Badge::HotDeal);
    }
    if change_for(sub_scores, MetricKind::ExchangeRate) > CURRENCY_WIN_THRESHOLD {
        badges.insert(Badge::CurrencyWin);
    }
    if change_for(sub_scores, MetricKind::FlightCost) > FLIGHT_DEAL_THRESHOLD {
        badges.insert(Badge::FlightDeal);
    }
    if change_for(sub_scores, MetricKind::CostOfLiving) > DEFLATION_THRESHOLD {
        badges.insert(Badge::Deflation);
    }
    if blended_for(sub_scores, MetricKind::Safety) >= SAFE_HAVEN_THRESHOLD {
        badges.insert(Badge::SafeHaven);
    }
    if visa == VisaCategory::VisaFree {
        badges.insert(Badge::EasyEntry);
    }
    if blended_for(sub_scores, MetricKind::Accessibility) >= WELL_CONNECTED_THRESHOLD {
        badges.insert(Badge::WellConnected);
    }

    badges
}

//! Destination ranking service: resolves live market metrics through a
//! circuit-breaker fallback chain, blends them against long-run baselines,
//! and records a daily score history.

pub mod config;
pub mod error;
pub mod ranking;
pub mod telemetry;

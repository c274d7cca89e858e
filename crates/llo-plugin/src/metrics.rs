//! # Plugin Metrics
//!
//! Prometheus metrics for monitoring round processing.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! llo-plugin = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `llo_observations_total` - Counter of observations produced
//! - `llo_observations_rejected_total` - Counter of rejected peer observations (by reason)
//! - `llo_outcomes_total` - Counter of outcomes generated (by lifecycle stage)
//! - `llo_reports_total` - Counter of reports generated (by report format)
//! - `llo_aggregation_failures_total` - Counter of failed stream aggregations (by aggregator)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total observations produced by this node
    pub static ref OBSERVATIONS: IntCounter = register_int_counter!(
        "llo_observations_total",
        "Total number of observations produced"
    )
    .expect("Failed to create OBSERVATIONS metric");

    /// Peer observations rejected by validation or dropped in Outcome
    pub static ref OBSERVATIONS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "llo_observations_rejected_total",
        "Total number of peer observations rejected",
        &["reason"]
    )
    .expect("Failed to create OBSERVATIONS_REJECTED metric");

    /// Outcomes generated, labeled by lifecycle stage
    pub static ref OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "llo_outcomes_total",
        "Total number of outcomes generated",
        &["stage"]
    )
    .expect("Failed to create OUTCOMES metric");

    /// Reports generated, labeled by report format
    pub static ref REPORTS: IntCounterVec = register_int_counter_vec!(
        "llo_reports_total",
        "Total number of reports generated",
        &["format"]
    )
    .expect("Failed to create REPORTS metric");

    /// Stream aggregations that produced no value
    pub static ref AGGREGATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "llo_aggregation_failures_total",
        "Total number of failed stream aggregations",
        &["aggregator"]
    )
    .expect("Failed to create AGGREGATION_FAILURES metric");
}

#[cfg(feature = "metrics")]
pub fn record_observation() {
    OBSERVATIONS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_observation_rejected(reason: &str) {
    OBSERVATIONS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_outcome(stage: &str) {
    OUTCOMES.with_label_values(&[stage]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_report(format: &str) {
    REPORTS.with_label_values(&[format]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_aggregation_failure(aggregator: &str) {
    AGGREGATION_FAILURES.with_label_values(&[aggregator]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_observation() {}

#[cfg(not(feature = "metrics"))]
pub fn record_observation_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_outcome(_stage: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_report(_format: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_aggregation_failure(_aggregator: &str) {}

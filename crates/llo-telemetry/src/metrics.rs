//! Prometheus exposition.
//!
//! The plugin registers its counters (`llo_*`) in the default registry; this
//! module renders that registry in the text exposition format for scraping.

use crate::TelemetryError;
use prometheus::{Encoder, TextEncoder};

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
}

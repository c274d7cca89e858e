//! # LLO Telemetry
//!
//! Logging and metrics exposition for processes embedding the LLO plugin.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` fmt or JSON output with an `EnvFilter`
//! - **Metrics**: text exposition of the plugin's Prometheus counters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use llo_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! // Plugin logs are now emitted; scrape `encode_metrics()` for counters.
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LLO_SERVICE_NAME` | `llo` | Service name attached to log lines |
//! | `LLO_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `LLO_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `LLO_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging, LoggingGuard};
pub use metrics::encode_metrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to encode metrics: {0}")]
    MetricsEncode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging for the process.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let logging = init_logging(&config)?;
    tracing::info!(service = %config.service_name, "[llo] Telemetry initialized");
    Ok(TelemetryGuard { _logging: logging })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("[llo] Shutting down telemetry");
    }
}

/// Span covering one protocol round of one plugin phase.
///
/// ```rust,ignore
/// let _span = llo_telemetry::round_span!(seq_nr, "Outcome", oracle_id = 3).entered();
/// ```
#[macro_export]
macro_rules! round_span {
    ($seq_nr:expr, $stage:expr $(, $($field:tt)*)?) => {
        tracing::info_span!("llo_round", seq_nr = $seq_nr, stage = $stage $(, $($field)*)?)
    };
}

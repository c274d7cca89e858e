//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;

/// Configuration for logging output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `info,llo_plugin=debug`
    pub log_level: String,

    /// Whether to write logs to stdout
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "llo".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LLO_SERVICE_NAME`: Service name (default: llo)
    /// - `LLO_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `LLO_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `LLO_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env::var("LLO_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: env::var("LLO_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: env::var("LLO_CONSOLE_OUTPUT")
                .ok()
                .and_then(|v| parse_bool(&v).ok())
                .unwrap_or(defaults.console_output),

            json_logs: env::var("LLO_JSON_LOGS")
                .ok()
                .and_then(|v| parse_bool(&v).ok())
                .unwrap_or(defaults.json_logs),
        }
    }
}

/// Accepts `true`/`false`/`1`/`0`, case-insensitive.
pub(crate) fn parse_bool(value: &str) -> Result<bool, TelemetryError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(TelemetryError::Config(format!(
            "expected a boolean, got {:?}",
            other
        ))),
    }
}

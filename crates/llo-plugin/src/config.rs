//! Plugin configuration from environment variables.

use std::env;

/// Local, non-consensus plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig {
    /// Log per-channel and per-stream diagnostics every round
    pub verbose_logging: bool,
}

impl PluginConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LLO_VERBOSE_LOGGING`: Enable verbose round logging (default: false)
    pub fn from_env() -> Self {
        Self {
            verbose_logging: env::var("LLO_VERBOSE_LOGGING")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

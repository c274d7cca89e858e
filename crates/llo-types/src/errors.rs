//! # Error Types
//!
//! Conversion failures for protocol identifiers.

use thiserror::Error;

/// Errors raised when decoding protocol identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Aggregator id is not assigned.
    #[error("Unknown aggregator id: {0}")]
    UnknownAggregator(u32),

    /// Report format id is not assigned.
    #[error("Unknown report format id: {0}")]
    UnknownReportFormat(u32),

    /// Life cycle stage name is not recognised.
    #[error("Unknown life cycle stage: {0}")]
    UnknownLifeCycleStage(String),

    /// Config digest has the wrong length.
    #[error("Invalid config digest length: expected 32, got {0}")]
    InvalidConfigDigestLength(usize),
}

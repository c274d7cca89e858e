//! Error types for the LLO plugin
//!
//! Errors returned from plugin callbacks are fatal to the round. Per-peer and
//! per-stream failures are logged and dropped inside the callbacks instead.

use crate::codec::CodecError;
use crate::domain::{ChannelDefinitionError, TimestampOverflowError};
use llo_types::{Aggregator, ChannelId, ReportFormat};
use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Plugin errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid SeqNr: {seq_nr}, must be >= 1")]
    InvalidSeqNr { seq_nr: u64 },

    #[error("Failed to decode previous outcome: {0}")]
    PreviousOutcomeDecode(#[source] CodecError),

    #[error("Failed to decode outcome: {0}")]
    OutcomeDecode(#[source] CodecError),

    #[error("Failed to decode observation: {0}")]
    ObservationDecode(#[source] CodecError),

    #[error("Encoding error: {0}")]
    Encode(#[from] CodecError),

    #[error("Invalid offchain config: {0}")]
    InvalidOffchainConfig(#[source] CodecError),

    #[error("Invalid plugin config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid number of observations: got {got}, need at least {need}")]
    InsufficientObservations { got: usize, need: usize },

    #[error("No valid observations")]
    NoValidObservations,

    #[error("No aggregator function for {aggregator}")]
    MissingAggregatorFunction { aggregator: Aggregator },

    #[error("No report codec registered for format {format}")]
    MissingReportCodec { format: ReportFormat },

    #[error("Failed to encode report for channel {channel_id}: {source}")]
    ReportEncode {
        channel_id: ChannelId,
        #[source]
        source: PortError,
    },

    #[error(transparent)]
    TimestampOverflow(#[from] TimestampOverflowError),

    #[error("Channel definition cache returned invalid definitions: {0}")]
    InvalidChannelDefinitionCache(#[source] ChannelDefinitionError),

    #[error("Failed to check should retire: {0}")]
    ShouldRetire(#[source] PortError),

    #[error("Expected empty observation for first round, got non-empty")]
    UnexpectedObservation,

    #[error("Observation carries a predecessor retirement report, but no predecessor is configured")]
    UnexpectedPredecessorRetirement,

    #[error("RemoveChannelIDs is too long: {count} vs {max}")]
    TooManyRemoveChannelIds { count: usize, max: usize },

    #[error("UpdateChannelDefinitions is too long: {count} vs {max}")]
    TooManyUpdateChannelDefinitions { count: usize, max: usize },

    #[error("StreamValues is too long: {count} vs {max}")]
    TooManyStreamValues { count: usize, max: usize },

    #[error("Invalid UpdateChannelDefinitions: {0}")]
    InvalidUpdateChannelDefinitions(#[source] ChannelDefinitionError),
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

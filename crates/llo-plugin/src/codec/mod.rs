//! Wire codecs
//!
//! Observation and outcome bytes are compared by the consensus transport, so
//! encoding must be a pure function of the logical value: maps are exploded
//! into slices sorted by key, stream values become `{type, bytes}` pairs, and
//! bincode runs with fixed-width big-endian integers. Decoders accept only
//! that canonical form and never panic on adversarial input.

mod offchain_config;
mod observation;
mod outcome;
mod retirement;
mod wire;

pub use offchain_config::OffchainConfig;
pub use observation::ObservationCodec;
pub use outcome::OutcomeCodec;
pub use retirement::{decode_retirement_report, encode_retirement_report};
pub(crate) use wire::wire_options;

use crate::domain::StreamValueError;
use llo_types::{StreamId, TypesError};
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Wire encoding error: {0}")]
    Wire(#[from] bincode::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for stream {stream_id}: {source}")]
    StreamValue {
        stream_id: StreamId,
        #[source]
        source: StreamValueError,
    },

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("Non-canonical {field}: keys must be strictly ascending")]
    NonCanonical { field: &'static str },

    #[error("Empty outcome")]
    EmptyOutcome,
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

//! Domain layer for the LLO plugin
//!
//! ## Modules
//! - stream_value: Decimal / Quote value model
//! - aggregation: Per-stream aggregation functions
//! - channel: Channel hashing and validation
//! - observation: Per-node round observation
//! - outcome: Network-agreed round outcome and reportability
//! - report: Reports and retirement handover state
//! - limits: Consensus-critical size bounds

pub mod aggregation;
pub mod channel;
pub mod limits;
pub mod observation;
pub mod outcome;
pub mod report;
pub mod stream_value;

pub use aggregation::{aggregator_func, AggregationError, AggregatorFn};
pub use channel::{
    make_channel_hash, subtract_channel_definitions, verify_channel_definitions, ChannelHash,
    ChannelDefinitionError,
};
pub use limits::*;
pub use observation::Observation;
pub use outcome::{
    Outcome, StreamAggregates, TimestampOverflowError, UnreportableChannel, UnreportableReason,
};
pub use report::{Report, ReportWithInfo, RetirementReport};
pub use stream_value::{Decimal, Quote, StreamValue, StreamValueError, StreamValueType, StreamValues};

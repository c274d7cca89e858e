//! Outcome entity
//!
//! The network-agreed state of one round. It is the only state carried from
//! one round to the next.

use super::stream_value::StreamValue;
use llo_types::{Aggregator, ChannelDefinitions, ChannelId, LifeCycleStage, StreamId};
use std::collections::BTreeMap;
use thiserror::Error;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Aggregated values by stream, then by aggregator. A stream usually has a
/// single aggregator, but channels may disagree on how to aggregate it.
pub type StreamAggregates = BTreeMap<StreamId, BTreeMap<Aggregator, StreamValue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Timestamp doesn't fit into uint32: {seconds}")]
pub struct TimestampOverflowError {
    pub seconds: i64,
}

/// Why a channel cannot be reported this round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnreportableReason {
    #[error("retired protocol instance")]
    Retired,

    #[error("invalid observations timestamp: {0}")]
    InvalidTimestamp(TimestampOverflowError),

    #[error("no channel definition with this ID")]
    NoChannelDefinition,

    #[error("no {aggregator} aggregate for stream {stream_id}")]
    MissingAggregate {
        stream_id: StreamId,
        aggregator: Aggregator,
    },

    #[error("no validAfterSeconds entry yet, this must be a new channel")]
    NoValidAfterSeconds,

    #[error(
        "not valid yet (observationsTimestampSeconds={observations_timestamp_seconds} <= validAfterSeconds={valid_after_seconds})"
    )]
    NotValidYet {
        valid_after_seconds: u32,
        observations_timestamp_seconds: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ChannelID: {channel_id}; Reason: {reason}")]
pub struct UnreportableChannel {
    pub channel_id: ChannelId,
    pub reason: UnreportableReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub life_cycle_stage: LifeCycleStage,
    /// Median of the observation timestamps of the round
    pub observations_timestamp_nanoseconds: i64,
    /// Channels for which reports are generated
    pub channel_definitions: ChannelDefinitions,
    /// Reports for a channel span (valid_after_seconds, observations timestamp]
    pub valid_after_seconds: BTreeMap<ChannelId, u32>,
    pub stream_aggregates: StreamAggregates,
}

impl Outcome {
    /// Minimal outcome of the first round.
    pub fn bootstrap(life_cycle_stage: LifeCycleStage) -> Self {
        Self {
            life_cycle_stage,
            observations_timestamp_nanoseconds: 0,
            channel_definitions: ChannelDefinitions::new(),
            valid_after_seconds: BTreeMap::new(),
            stream_aggregates: StreamAggregates::new(),
        }
    }

    /// Observations timestamp rounded down to whole seconds.
    pub fn observations_timestamp_seconds(&self) -> Result<u32, TimestampOverflowError> {
        let seconds = self
            .observations_timestamp_nanoseconds
            .div_euclid(NANOS_PER_SECOND);
        u32::try_from(seconds).map_err(|_| TimestampOverflowError { seconds })
    }

    pub fn aggregate(&self, stream_id: StreamId, aggregator: Aggregator) -> Option<&StreamValue> {
        self.stream_aggregates
            .get(&stream_id)
            .and_then(|by_aggregator| by_aggregator.get(&aggregator))
    }

    /// Checks are applied in a fixed order; the first failing one is the
    /// reported reason.
    pub fn is_reportable(&self, channel_id: ChannelId) -> Result<(), UnreportableChannel> {
        let unreportable = |reason| UnreportableChannel { channel_id, reason };

        if self.life_cycle_stage == LifeCycleStage::Retired {
            return Err(unreportable(UnreportableReason::Retired));
        }

        let observations_timestamp_seconds = self
            .observations_timestamp_seconds()
            .map_err(|e| unreportable(UnreportableReason::InvalidTimestamp(e)))?;

        let definition = self
            .channel_definitions
            .get(&channel_id)
            .ok_or_else(|| unreportable(UnreportableReason::NoChannelDefinition))?;

        // Streams of channels added this round were not observed yet
        for stream in &definition.streams {
            if self.aggregate(stream.stream_id, stream.aggregator).is_none() {
                return Err(unreportable(UnreportableReason::MissingAggregate {
                    stream_id: stream.stream_id,
                    aggregator: stream.aggregator,
                }));
            }
        }

        let valid_after_seconds = *self
            .valid_after_seconds
            .get(&channel_id)
            .ok_or_else(|| unreportable(UnreportableReason::NoValidAfterSeconds))?;

        if valid_after_seconds >= observations_timestamp_seconds {
            return Err(unreportable(UnreportableReason::NotValidYet {
                valid_after_seconds,
                observations_timestamp_seconds,
            }));
        }

        Ok(())
    }

    /// Reportable channel ids in ascending order, plus the reasons for the rest.
    pub fn reportable_channels(&self) -> (Vec<ChannelId>, Vec<UnreportableChannel>) {
        let mut reportable = Vec::new();
        let mut unreportable = Vec::new();
        for &channel_id in self.channel_definitions.keys() {
            match self.is_reportable(channel_id) {
                Ok(()) => reportable.push(channel_id),
                Err(e) => unreportable.push(e),
            }
        }
        (reportable, unreportable)
    }
}

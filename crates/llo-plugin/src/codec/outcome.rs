//! Outcome codec

use super::wire::{
    channel_definitions_from_wire, channel_definitions_to_wire, ensure_ascending, wire_options,
    WireChannelDefinition, WireStreamValue,
};
use super::{CodecError, CodecResult};
use crate::domain::{Outcome, StreamAggregates, MAX_MAX_OUTCOME_LENGTH};
use bincode::Options;
use llo_types::{Aggregator, LifeCycleStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
struct WireValidAfterSeconds {
    channel_id: u32,
    valid_after_seconds: u32,
}

#[derive(Serialize, Deserialize)]
struct WireStreamAggregate {
    stream_id: u32,
    aggregator: u32,
    value: WireStreamValue,
}

#[derive(Serialize, Deserialize)]
struct WireOutcome {
    life_cycle_stage: LifeCycleStage,
    observations_timestamp_nanoseconds: i64,
    channel_definitions: Vec<WireChannelDefinition>,
    valid_after_seconds: Vec<WireValidAfterSeconds>,
    stream_aggregates: Vec<WireStreamAggregate>,
}

/// Deterministic binary codec for [`Outcome`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeCodec;

impl OutcomeCodec {
    pub fn encode(&self, outcome: &Outcome) -> CodecResult<Vec<u8>> {
        let wire = WireOutcome {
            life_cycle_stage: outcome.life_cycle_stage,
            observations_timestamp_nanoseconds: outcome.observations_timestamp_nanoseconds,
            channel_definitions: channel_definitions_to_wire(&outcome.channel_definitions),
            valid_after_seconds: outcome
                .valid_after_seconds
                .iter()
                .map(|(&channel_id, &valid_after_seconds)| WireValidAfterSeconds {
                    channel_id,
                    valid_after_seconds,
                })
                .collect(),
            // Sorted by stream id, then aggregator id
            stream_aggregates: outcome
                .stream_aggregates
                .iter()
                .flat_map(|(&stream_id, by_aggregator)| {
                    by_aggregator
                        .iter()
                        .map(move |(aggregator, value)| WireStreamAggregate {
                            stream_id,
                            aggregator: aggregator.id(),
                            value: WireStreamValue::from_value(value),
                        })
                })
                .collect(),
        };
        Ok(wire_options(MAX_MAX_OUTCOME_LENGTH).serialize(&wire)?)
    }

    /// Unlike observations, an outcome is never empty; empty input is an error.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Outcome> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyOutcome);
        }

        let wire: WireOutcome = wire_options(MAX_MAX_OUTCOME_LENGTH).deserialize(bytes)?;

        ensure_ascending(
            wire.valid_after_seconds.iter().map(|v| v.channel_id),
            "valid_after_seconds",
        )?;
        ensure_ascending(
            wire.stream_aggregates
                .iter()
                .map(|a| (a.stream_id, a.aggregator)),
            "stream_aggregates",
        )?;

        let channel_definitions =
            channel_definitions_from_wire(wire.channel_definitions, "channel_definitions")?;

        let valid_after_seconds: BTreeMap<_, _> = wire
            .valid_after_seconds
            .into_iter()
            .map(|v| (v.channel_id, v.valid_after_seconds))
            .collect();

        let mut stream_aggregates = StreamAggregates::new();
        for aggregate in wire.stream_aggregates {
            let aggregator = Aggregator::try_from(aggregate.aggregator)?;
            let value = aggregate.value.into_value(aggregate.stream_id)?;
            stream_aggregates
                .entry(aggregate.stream_id)
                .or_default()
                .insert(aggregator, value);
        }

        Ok(Outcome {
            life_cycle_stage: wire.life_cycle_stage,
            observations_timestamp_nanoseconds: wire.observations_timestamp_nanoseconds,
            channel_definitions,
            valid_after_seconds,
            stream_aggregates,
        })
    }
}

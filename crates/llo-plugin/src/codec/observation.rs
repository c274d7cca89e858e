//! Observation codec

use super::wire::{
    channel_definitions_from_wire, channel_definitions_to_wire, ensure_ascending, wire_options,
    WireChannelDefinition, WireStreamValue,
};
use super::CodecResult;
use crate::domain::{Observation, MAX_MAX_OBSERVATION_LENGTH};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
struct WireStreamValueEntry {
    stream_id: u32,
    value: WireStreamValue,
}

#[derive(Serialize, Deserialize)]
struct WireObservation {
    attested_predecessor_retirement: Vec<u8>,
    should_retire: bool,
    unix_timestamp_nanoseconds: i64,
    remove_channel_ids: Vec<u32>,
    update_channel_definitions: Vec<WireChannelDefinition>,
    stream_values: Vec<WireStreamValueEntry>,
}

/// Deterministic binary codec for [`Observation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationCodec;

impl ObservationCodec {
    pub fn encode(&self, observation: &Observation) -> CodecResult<Vec<u8>> {
        let wire = WireObservation {
            attested_predecessor_retirement: observation.attested_predecessor_retirement.clone(),
            should_retire: observation.should_retire,
            unix_timestamp_nanoseconds: observation.unix_timestamp_nanoseconds,
            remove_channel_ids: observation.remove_channel_ids.iter().copied().collect(),
            update_channel_definitions: channel_definitions_to_wire(
                &observation.update_channel_definitions,
            ),
            stream_values: observation
                .stream_values
                .iter()
                .map(|(&stream_id, value)| WireStreamValueEntry {
                    stream_id,
                    value: WireStreamValue::from_value(value),
                })
                .collect(),
        };
        Ok(wire_options(MAX_MAX_OBSERVATION_LENGTH).serialize(&wire)?)
    }

    /// Empty input decodes to the empty observation of the bootstrap round.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Observation> {
        if bytes.is_empty() {
            return Ok(Observation::default());
        }

        let wire: WireObservation = wire_options(MAX_MAX_OBSERVATION_LENGTH).deserialize(bytes)?;

        ensure_ascending(wire.remove_channel_ids.iter().copied(), "remove_channel_ids")?;
        ensure_ascending(
            wire.stream_values.iter().map(|e| e.stream_id),
            "stream_values",
        )?;

        let update_channel_definitions = channel_definitions_from_wire(
            wire.update_channel_definitions,
            "update_channel_definitions",
        )?;

        let stream_values: BTreeMap<_, _> = wire
            .stream_values
            .into_iter()
            .map(|entry| Ok((entry.stream_id, entry.value.into_value(entry.stream_id)?)))
            .collect::<CodecResult<_>>()?;

        Ok(Observation {
            attested_predecessor_retirement: wire.attested_predecessor_retirement,
            should_retire: wire.should_retire,
            unix_timestamp_nanoseconds: wire.unix_timestamp_nanoseconds,
            remove_channel_ids: wire.remove_channel_ids.into_iter().collect(),
            update_channel_definitions,
            stream_values,
        })
    }
}

//! Shared wire representations

use super::{CodecError, CodecResult};
use crate::domain::{StreamValue, StreamValueType};
use bincode::Options;
use llo_types::{Aggregator, ChannelDefinition, ChannelDefinitions, ReportFormat, StreamDefinition, StreamId};
use serde::{Deserialize, Serialize};

/// Fixed-width big-endian integers, bounded input, no trailing bytes.
pub(crate) fn wire_options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(limit as u64)
        .reject_trailing_bytes()
}

/// Keys must be strictly ascending, which also rules out duplicates.
pub(crate) fn ensure_ascending<K: Ord>(
    keys: impl IntoIterator<Item = K>,
    field: &'static str,
) -> CodecResult<()> {
    let mut previous: Option<K> = None;
    for key in keys {
        if let Some(prev) = &previous {
            if *prev >= key {
                return Err(CodecError::NonCanonical { field });
            }
        }
        previous = Some(key);
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct WireStreamValue {
    pub value_type: u8,
    pub value: Vec<u8>,
}

impl WireStreamValue {
    pub fn from_value(value: &StreamValue) -> Self {
        Self {
            value_type: value.value_type() as u8,
            value: value.marshal_binary(),
        }
    }

    pub fn into_value(self, stream_id: StreamId) -> CodecResult<StreamValue> {
        StreamValueType::try_from(self.value_type)
            .and_then(|value_type| StreamValue::unmarshal_binary(value_type, &self.value))
            .map_err(|source| CodecError::StreamValue { stream_id, source })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct WireStreamDefinition {
    pub stream_id: u32,
    pub aggregator: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct WireChannelDefinition {
    pub channel_id: u32,
    pub report_format: u32,
    pub chain_selector: u64,
    pub streams: Vec<WireStreamDefinition>,
    pub opts: Vec<u8>,
}

pub(crate) fn channel_definitions_to_wire(
    definitions: &ChannelDefinitions,
) -> Vec<WireChannelDefinition> {
    // BTreeMap iteration is already id-ascending
    definitions
        .iter()
        .map(|(&channel_id, definition)| WireChannelDefinition {
            channel_id,
            report_format: definition.report_format.id(),
            chain_selector: definition.chain_selector,
            streams: definition
                .streams
                .iter()
                .map(|s| WireStreamDefinition {
                    stream_id: s.stream_id,
                    aggregator: s.aggregator.id(),
                })
                .collect(),
            opts: definition.opts.clone(),
        })
        .collect()
}

pub(crate) fn channel_definitions_from_wire(
    wire: Vec<WireChannelDefinition>,
    field: &'static str,
) -> CodecResult<ChannelDefinitions> {
    ensure_ascending(wire.iter().map(|c| c.channel_id), field)?;

    let mut definitions = ChannelDefinitions::new();
    for channel in wire {
        let streams = channel
            .streams
            .into_iter()
            .map(|s| Ok(StreamDefinition::new(s.stream_id, Aggregator::try_from(s.aggregator)?)))
            .collect::<CodecResult<Vec<_>>>()?;
        definitions.insert(
            channel.channel_id,
            ChannelDefinition {
                report_format: ReportFormat::try_from(channel.report_format)?,
                chain_selector: channel.chain_selector,
                streams,
                opts: channel.opts,
            },
        );
    }
    Ok(definitions)
}

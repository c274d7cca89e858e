//! Channel definition helpers
//!
//! Content hashing for vote counting, structural validation, and the
//! ID-ascending truncated set difference used when building proposals.

use super::limits::MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH;
use llo_types::{Aggregator, ChannelDefinition, ChannelDefinitions, ChannelId, ReportFormat, StreamId};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 content hash of a channel id together with its definition.
pub type ChannelHash = [u8; 32];

/// Structural problems with a set of channel definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelDefinitionError {
    #[error("Too many channels: {count} > {max}")]
    TooManyChannels { count: usize, max: usize },

    #[error("Channel {channel_id} has no streams")]
    EmptyStreams { channel_id: ChannelId },

    #[error("Channel {channel_id} stream {stream_id} has an unspecified aggregator")]
    UnspecifiedAggregator {
        channel_id: ChannelId,
        stream_id: StreamId,
    },

    #[error("Channel {channel_id} uses reserved report format {format}")]
    ReservedReportFormat {
        channel_id: ChannelId,
        format: ReportFormat,
    },
}

/// Hash used to count independent "add/replace this exact channel" votes as
/// the same proposal.
pub fn make_channel_hash(channel_id: ChannelId, definition: &ChannelDefinition) -> ChannelHash {
    let mut hasher = Sha256::new();
    hasher.update(channel_id.to_be_bytes());
    hasher.update(definition.report_format.id().to_be_bytes());
    hasher.update(definition.chain_selector.to_be_bytes());
    hasher.update((definition.streams.len() as u32).to_be_bytes());
    for stream in &definition.streams {
        hasher.update(stream.stream_id.to_be_bytes());
        hasher.update(stream.aggregator.id().to_be_bytes());
    }
    hasher.update(&definition.opts);
    hasher.finalize().into()
}

pub fn verify_channel_definitions(
    definitions: &ChannelDefinitions,
) -> Result<(), ChannelDefinitionError> {
    if definitions.len() > MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH {
        return Err(ChannelDefinitionError::TooManyChannels {
            count: definitions.len(),
            max: MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH,
        });
    }
    for (&channel_id, definition) in definitions {
        if definition.report_format == ReportFormat::Retirement {
            return Err(ChannelDefinitionError::ReservedReportFormat {
                channel_id,
                format: definition.report_format,
            });
        }
        if definition.streams.is_empty() {
            return Err(ChannelDefinitionError::EmptyStreams { channel_id });
        }
        if let Some(stream) = definition
            .streams
            .iter()
            .find(|s| s.aggregator == Aggregator::Unspecified)
        {
            return Err(ChannelDefinitionError::UnspecifiedAggregator {
                channel_id,
                stream_id: stream.stream_id,
            });
        }
    }
    Ok(())
}

/// Channels in `minuend` but not in `subtrahend`, lowest ids first, at most
/// `limit` of them.
pub fn subtract_channel_definitions(
    minuend: &ChannelDefinitions,
    subtrahend: &ChannelDefinitions,
    limit: usize,
) -> ChannelDefinitions {
    minuend
        .iter()
        .filter(|(id, _)| !subtrahend.contains_key(*id))
        .take(limit)
        .map(|(&id, definition)| (id, definition.clone()))
        .collect()
}

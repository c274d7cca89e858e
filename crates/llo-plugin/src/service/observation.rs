//! Observation and ValidateObservation phases

use super::{ensure_valid_seq_nr, Plugin};
use crate::domain::{
    subtract_channel_definitions, verify_channel_definitions, Observation, StreamValue,
    StreamValues, MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH, MAX_OBSERVATION_STREAM_VALUES_LENGTH,
    MAX_OBSERVATION_UPDATE_CHANNEL_DEFINITIONS_LENGTH,
};
use crate::error::{PluginError, PluginResult};
use crate::metrics;
use crate::ports::{
    AttributedObservation, ChannelDefinitionCache, DataSource, DsOpts, OutcomeContext,
    PredecessorRetirementReportCache, ShouldRetireCache,
};
use futures::future::join_all;
use llo_types::{ChannelDefinitions, ChannelId, LifeCycleStage, StreamId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

impl<D, C, S, P> Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    pub(super) async fn make_observation(
        &self,
        outctx: &OutcomeContext,
        _query: &[u8],
    ) -> PluginResult<Vec<u8>> {
        ensure_valid_seq_nr(outctx.seq_nr)?;
        if outctx.seq_nr == 1 {
            // The bootstrap outcome ignores observations
            return Ok(Vec::new());
        }

        // Taken before any stream is observed
        let unix_timestamp_nanoseconds = self.time_source.now_nanos();

        let previous_outcome = self
            .outcome_codec
            .decode(&outctx.previous_outcome)
            .map_err(PluginError::PreviousOutcomeDecode)?;

        let mut attested_predecessor_retirement = Vec::new();
        if let Some(predecessor) = self.params.predecessor_config_digest {
            if previous_outcome.life_cycle_stage == LifeCycleStage::Staging {
                match self
                    .predecessor_retirement_report_cache
                    .attested_retirement_report(predecessor)
                    .await
                {
                    Ok(Some(attested)) => attested_predecessor_retirement = attested,
                    Ok(None) => {}
                    Err(e) => warn!(
                        seq_nr = outctx.seq_nr,
                        predecessor = %predecessor,
                        "[llo] Failed to fetch attested retirement report, omitting: {}",
                        e
                    ),
                }
            }
        }

        let should_retire = self
            .should_retire_cache
            .should_retire()
            .map_err(PluginError::ShouldRetire)?;

        let expected = self.channel_definition_cache.definitions();
        verify_channel_definitions(&expected).map_err(PluginError::InvalidChannelDefinitionCache)?;

        let remove_channel_ids = removal_votes(
            &previous_outcome.channel_definitions,
            previous_outcome.valid_after_seconds.keys().copied(),
            &expected,
        );
        let update_channel_definitions =
            update_votes(&previous_outcome.channel_definitions, &expected);

        if !update_channel_definitions.is_empty() {
            debug!(
                seq_nr = outctx.seq_nr,
                stage = "Observation",
                "[llo] Voting to update channel definitions: {:?}",
                update_channel_definitions.keys().collect::<Vec<_>>()
            );
        }
        if !remove_channel_ids.is_empty() {
            debug!(
                seq_nr = outctx.seq_nr,
                stage = "Observation",
                "[llo] Voting to remove channel definitions: {:?}",
                remove_channel_ids
            );
        }

        let stream_values = if previous_outcome.channel_definitions.is_empty() {
            debug!(
                seq_nr = outctx.seq_nr,
                stage = "Observation",
                "[llo] ChannelDefinitions is empty, will not generate any observations"
            );
            BTreeMap::new()
        } else {
            self.observe_streams(&previous_outcome.channel_definitions, outctx.seq_nr)
                .await
        };

        let observation = Observation {
            attested_predecessor_retirement,
            should_retire,
            unix_timestamp_nanoseconds,
            remove_channel_ids,
            update_channel_definitions,
            stream_values,
        };

        let encoded = self.observation_codec.encode(&observation)?;
        metrics::record_observation();
        Ok(encoded)
    }

    /// One data source request per referenced stream, run concurrently.
    /// Failed or empty requests leave the stream absent.
    async fn observe_streams(
        &self,
        channel_definitions: &ChannelDefinitions,
        seq_nr: u64,
    ) -> BTreeMap<StreamId, StreamValue> {
        let referenced: BTreeSet<StreamId> = channel_definitions
            .values()
            .flat_map(|definition| definition.streams.iter().map(|s| s.stream_id))
            .collect();

        if referenced.len() > MAX_OBSERVATION_STREAM_VALUES_LENGTH {
            warn!(
                seq_nr,
                stage = "Observation",
                "[llo] Channels reference {} streams, observing only the lowest {}",
                referenced.len(),
                MAX_OBSERVATION_STREAM_VALUES_LENGTH
            );
        }

        let opts = DsOpts {
            verbose_logging: self.config.verbose_logging,
            seq_nr,
        };
        let data_source = &self.data_source;
        let requests = referenced
            .into_iter()
            .take(MAX_OBSERVATION_STREAM_VALUES_LENGTH)
            .map(|stream_id| async move {
                let mut request = StreamValues::from([(stream_id, None)]);
                if let Err(e) = data_source.observe(&mut request, opts).await {
                    if opts.verbose_logging {
                        debug!(seq_nr, stream_id, "[llo] Stream observation failed: {}", e);
                    }
                    return None;
                }
                request
                    .remove(&stream_id)
                    .flatten()
                    .map(|value| (stream_id, value))
            });

        join_all(requests).await.into_iter().flatten().collect()
    }

    pub(super) fn check_observation(
        &self,
        outctx: &OutcomeContext,
        ao: &AttributedObservation,
    ) -> PluginResult<()> {
        let result = self.validate(outctx, ao);
        if let Err(e) = &result {
            warn!(
                seq_nr = outctx.seq_nr,
                oracle_id = ao.observer,
                "[llo] Rejecting observation: {}",
                e
            );
            metrics::record_observation_rejected(rejection_label(e));
        }
        result
    }

    fn validate(&self, outctx: &OutcomeContext, ao: &AttributedObservation) -> PluginResult<()> {
        ensure_valid_seq_nr(outctx.seq_nr)?;
        if outctx.seq_nr == 1 && !ao.observation.is_empty() {
            return Err(PluginError::UnexpectedObservation);
        }

        let observation = self
            .observation_codec
            .decode(&ao.observation)
            .map_err(PluginError::ObservationDecode)?;

        if self.params.predecessor_config_digest.is_none()
            && !observation.attested_predecessor_retirement.is_empty()
        {
            return Err(PluginError::UnexpectedPredecessorRetirement);
        }

        if observation.update_channel_definitions.len()
            > MAX_OBSERVATION_UPDATE_CHANNEL_DEFINITIONS_LENGTH
        {
            return Err(PluginError::TooManyUpdateChannelDefinitions {
                count: observation.update_channel_definitions.len(),
                max: MAX_OBSERVATION_UPDATE_CHANNEL_DEFINITIONS_LENGTH,
            });
        }

        if observation.remove_channel_ids.len() > MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH {
            return Err(PluginError::TooManyRemoveChannelIds {
                count: observation.remove_channel_ids.len(),
                max: MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH,
            });
        }

        verify_channel_definitions(&observation.update_channel_definitions)
            .map_err(PluginError::InvalidUpdateChannelDefinitions)?;

        if observation.stream_values.len() > MAX_OBSERVATION_STREAM_VALUES_LENGTH {
            return Err(PluginError::TooManyStreamValues {
                count: observation.stream_values.len(),
                max: MAX_OBSERVATION_STREAM_VALUES_LENGTH,
            });
        }

        Ok(())
    }
}

/// Channels in the previous outcome that the authoritative set no longer
/// has, then stale ValidAfterSeconds entries, lowest ids first, capped.
fn removal_votes(
    previous_definitions: &ChannelDefinitions,
    previous_valid_after_ids: impl Iterator<Item = ChannelId>,
    expected: &ChannelDefinitions,
) -> BTreeSet<ChannelId> {
    let mut remove: BTreeSet<ChannelId> = subtract_channel_definitions(
        previous_definitions,
        expected,
        MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH,
    )
    .into_keys()
    .collect();

    for channel_id in previous_valid_after_ids {
        if remove.len() >= MAX_OBSERVATION_REMOVE_CHANNEL_IDS_LENGTH {
            break;
        }
        if !expected.contains_key(&channel_id) {
            remove.insert(channel_id);
        }
    }
    remove
}

/// Authoritative channels that are new or differ from the previous outcome,
/// lowest ids first, capped.
fn update_votes(
    previous_definitions: &ChannelDefinitions,
    expected: &ChannelDefinitions,
) -> ChannelDefinitions {
    expected
        .iter()
        .filter(|&(id, definition)| previous_definitions.get(id) != Some(definition))
        .take(MAX_OBSERVATION_UPDATE_CHANNEL_DEFINITIONS_LENGTH)
        .map(|(&id, definition)| (id, definition.clone()))
        .collect()
}

fn rejection_label(error: &PluginError) -> &'static str {
    match error {
        PluginError::InvalidSeqNr { .. } => "invalid_seq_nr",
        PluginError::UnexpectedObservation => "unexpected_observation",
        PluginError::ObservationDecode(_) => "decode",
        PluginError::UnexpectedPredecessorRetirement => "unexpected_retirement",
        PluginError::TooManyUpdateChannelDefinitions { .. }
        | PluginError::TooManyRemoveChannelIds { .. }
        | PluginError::TooManyStreamValues { .. } => "too_long",
        PluginError::InvalidUpdateChannelDefinitions(_) => "invalid_channel_definitions",
        _ => "other",
    }
}

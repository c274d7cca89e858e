//! Outcome phase
//!
//! Pure function of the previous outcome and the round's observations. Every
//! collection that influences the result is ordered, so all honest nodes
//! encode byte-identical outcomes.

use super::Plugin;
use crate::domain::{
    aggregator_func, make_channel_hash, ChannelHash, Observation, Outcome, RetirementReport,
    StreamAggregates, StreamValue, MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH,
};
use crate::error::{PluginError, PluginResult};
use crate::metrics;
use crate::ports::{
    AttributedObservation, ChannelDefinitionCache, DataSource, OutcomeContext,
    PredecessorRetirementReportCache, ShouldRetireCache,
};
use llo_types::{Aggregator, ChannelDefinition, ChannelId, LifeCycleStage, StreamId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Everything the outcome needs from one round's accepted observations.
#[derive(Default)]
struct ObservationTally {
    predecessor_retirement: Option<RetirementReport>,
    should_retire_votes: usize,
    timestamps_nanoseconds: Vec<i64>,
    remove_votes: BTreeMap<ChannelId, usize>,
    /// Keyed by channel id first so additions apply in id order
    update_votes: BTreeMap<(ChannelId, ChannelHash), (usize, ChannelDefinition)>,
    stream_observations: BTreeMap<StreamId, Vec<StreamValue>>,
}

impl<D, C, S, P> Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    pub(super) fn make_outcome(
        &self,
        outctx: &OutcomeContext,
        aos: &[AttributedObservation],
    ) -> PluginResult<Vec<u8>> {
        let need = 2 * self.f() + 1;
        if aos.len() < need {
            return Err(PluginError::InsufficientObservations {
                got: aos.len(),
                need,
            });
        }

        if outctx.seq_nr <= 1 {
            let stage = if self.params.predecessor_config_digest.is_some() {
                LifeCycleStage::Staging
            } else {
                LifeCycleStage::Production
            };
            metrics::record_outcome(stage.as_str());
            return Ok(self.outcome_codec.encode(&Outcome::bootstrap(stage))?);
        }

        let previous_outcome = self
            .outcome_codec
            .decode(&outctx.previous_outcome)
            .map_err(PluginError::PreviousOutcomeDecode)?;

        let tally = self.tally_observations(outctx.seq_nr, &previous_outcome, aos);
        let outcome = self.fold_outcome(outctx.seq_nr, &previous_outcome, tally)?;

        if self.config.verbose_logging {
            debug!(
                seq_nr = outctx.seq_nr,
                stage = "Outcome",
                "[llo] Generated outcome: {:?}",
                outcome
            );
        }
        metrics::record_outcome(outcome.life_cycle_stage.as_str());
        Ok(self.outcome_codec.encode(&outcome)?)
    }

    fn tally_observations(
        &self,
        seq_nr: u64,
        previous_outcome: &Outcome,
        aos: &[AttributedObservation],
    ) -> ObservationTally {
        let mut tally = ObservationTally::default();

        for ao in aos {
            let observation = match self.observation_codec.decode(&ao.observation) {
                Ok(observation) => observation,
                Err(e) => {
                    warn!(
                        seq_nr,
                        oracle_id = ao.observer,
                        "[llo] Ignoring invalid observation: {}",
                        e
                    );
                    metrics::record_observation_rejected("decode");
                    continue;
                }
            };

            if !observation.attested_predecessor_retirement.is_empty() {
                match self.check_retirement_evidence(previous_outcome, &observation, &tally) {
                    Ok(Some(report)) => tally.predecessor_retirement = Some(report),
                    Ok(None) => {}
                    Err(reason) => {
                        warn!(
                            seq_nr,
                            oracle_id = ao.observer,
                            "[llo] Ignoring observation with invalid attested predecessor retirement: {}",
                            reason
                        );
                        metrics::record_observation_rejected("invalid_retirement");
                        continue;
                    }
                }
            }

            if observation.should_retire {
                tally.should_retire_votes += 1;
            }

            tally
                .timestamps_nanoseconds
                .push(observation.unix_timestamp_nanoseconds);

            for channel_id in observation.remove_channel_ids {
                *tally.remove_votes.entry(channel_id).or_default() += 1;
            }

            for (channel_id, definition) in observation.update_channel_definitions {
                let hash = make_channel_hash(channel_id, &definition);
                tally
                    .update_votes
                    .entry((channel_id, hash))
                    .or_insert((0, definition))
                    .0 += 1;
            }

            if self.config.verbose_logging {
                debug!(
                    seq_nr,
                    oracle_id = ao.observer,
                    stage = "Outcome",
                    "[llo] Got {} stream values from peer",
                    observation.stream_values.len()
                );
            }
            for (stream_id, value) in observation.stream_values {
                tally
                    .stream_observations
                    .entry(stream_id)
                    .or_default()
                    .push(value);
            }
        }

        tally
    }

    /// Verifies evidence only while it can still matter: the instance is
    /// staging and no valid report has been found yet this round.
    fn check_retirement_evidence(
        &self,
        previous_outcome: &Outcome,
        observation: &Observation,
        tally: &ObservationTally,
    ) -> Result<Option<RetirementReport>, String> {
        let predecessor = self
            .params
            .predecessor_config_digest
            .ok_or_else(|| "this instance has no predecessor".to_string())?;

        if previous_outcome.life_cycle_stage != LifeCycleStage::Staging
            || tally.predecessor_retirement.is_some()
        {
            return Ok(None);
        }

        self.predecessor_retirement_report_cache
            .check_attested_retirement_report(
                predecessor,
                &observation.attested_predecessor_retirement,
            )
            .map(Some)
            .map_err(|e| e.to_string())
    }

    fn fold_outcome(
        &self,
        seq_nr: u64,
        previous_outcome: &Outcome,
        tally: ObservationTally,
    ) -> PluginResult<Outcome> {
        let ObservationTally {
            predecessor_retirement,
            should_retire_votes,
            mut timestamps_nanoseconds,
            mut remove_votes,
            mut update_votes,
            stream_observations,
        } = tally;

        if timestamps_nanoseconds.is_empty() {
            return Err(PluginError::NoValidObservations);
        }

        // Lifecycle stage
        let mut promoted_valid_after_seconds = None;
        let mut life_cycle_stage = previous_outcome.life_cycle_stage;
        if life_cycle_stage == LifeCycleStage::Staging {
            if let Some(report) = predecessor_retirement {
                debug!(seq_nr, stage = "Outcome", "[llo] Promoting to production");
                promoted_valid_after_seconds = Some(report.valid_after_seconds);
                life_cycle_stage = LifeCycleStage::Production;
            }
        }
        if life_cycle_stage == LifeCycleStage::Production && should_retire_votes > self.f() {
            debug!(
                seq_nr,
                stage = "Outcome",
                should_retire_votes,
                "[llo] Retiring protocol instance"
            );
            life_cycle_stage = LifeCycleStage::Retired;
        }

        // Upper median timestamp
        timestamps_nanoseconds.sort_unstable();
        let observations_timestamp_nanoseconds =
            timestamps_nanoseconds[timestamps_nanoseconds.len() / 2];

        let mut outcome = Outcome {
            life_cycle_stage,
            observations_timestamp_nanoseconds,
            channel_definitions: previous_outcome.channel_definitions.clone(),
            valid_after_seconds: BTreeMap::new(),
            stream_aggregates: StreamAggregates::new(),
        };

        // Retired instances stop voting on channels for good
        if life_cycle_stage == LifeCycleStage::Retired {
            remove_votes.clear();
            update_votes.clear();
        }

        let removed: BTreeSet<ChannelId> = remove_votes
            .into_iter()
            .filter(|&(_, votes)| votes > self.f())
            .map(|(channel_id, _)| channel_id)
            .collect();
        for channel_id in &removed {
            outcome.channel_definitions.remove(channel_id);
        }

        self.apply_update_votes(seq_nr, &mut outcome, update_votes);

        outcome.valid_after_seconds = match promoted_valid_after_seconds {
            Some(valid_after_seconds) => valid_after_seconds,
            None => carry_forward_valid_after_seconds(previous_outcome)?,
        };

        let observations_timestamp_seconds = outcome.observations_timestamp_seconds()?;
        for &channel_id in outcome.channel_definitions.keys() {
            outcome
                .valid_after_seconds
                .entry(channel_id)
                .or_insert(observations_timestamp_seconds);
        }

        // Entries of channels missing from the definitions are kept until an
        // explicit removal vote, so a promotion during ramp-up leaves no gap.
        for channel_id in &removed {
            outcome.valid_after_seconds.remove(channel_id);
        }

        outcome.stream_aggregates = self.aggregate_streams(seq_nr, &outcome, &stream_observations)?;

        Ok(outcome)
    }

    fn apply_update_votes(
        &self,
        seq_nr: u64,
        outcome: &mut Outcome,
        update_votes: BTreeMap<(ChannelId, ChannelHash), (usize, ChannelDefinition)>,
    ) {
        for ((channel_id, _), (votes, definition)) in update_votes {
            if votes <= self.f() {
                continue;
            }
            if outcome.channel_definitions.contains_key(&channel_id) {
                debug!(
                    seq_nr,
                    channel_id,
                    stage = "Outcome",
                    "[llo] Adding channel (replacement)"
                );
            } else if outcome.channel_definitions.len() >= MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH {
                // Later votes may still be replacements
                warn!(
                    seq_nr,
                    channel_id,
                    max = MAX_OUTCOME_CHANNEL_DEFINITIONS_LENGTH,
                    "[llo] Cannot add channel, outcome already contains maximum number of channels"
                );
                continue;
            } else {
                debug!(seq_nr, channel_id, stage = "Outcome", "[llo] Adding channel (new)");
            }
            outcome.channel_definitions.insert(channel_id, definition);
        }
    }

    /// One aggregation per referenced (stream, aggregator) pair, shared by
    /// every channel that uses it. Failed aggregations leave the pair absent.
    fn aggregate_streams(
        &self,
        seq_nr: u64,
        outcome: &Outcome,
        stream_observations: &BTreeMap<StreamId, Vec<StreamValue>>,
    ) -> PluginResult<StreamAggregates> {
        let pairs: BTreeSet<(StreamId, Aggregator)> = outcome
            .channel_definitions
            .values()
            .flat_map(|definition| {
                definition
                    .streams
                    .iter()
                    .map(|s| (s.stream_id, s.aggregator))
            })
            .collect();

        let mut aggregates = StreamAggregates::new();
        for (stream_id, aggregator) in pairs {
            let aggregate = aggregator_func(aggregator)
                .ok_or(PluginError::MissingAggregatorFunction { aggregator })?;

            let values = stream_observations
                .get(&stream_id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            match aggregate(values, self.f()) {
                Ok(value) => {
                    aggregates
                        .entry(stream_id)
                        .or_default()
                        .insert(aggregator, value);
                }
                Err(e) => {
                    if self.config.verbose_logging {
                        warn!(
                            seq_nr,
                            stream_id,
                            %aggregator,
                            f = self.f(),
                            "[llo] Aggregation failed: {}",
                            e
                        );
                    } else {
                        debug!(seq_nr, stream_id, %aggregator, "[llo] Aggregation failed: {}", e);
                    }
                    metrics::record_aggregation_failure(&aggregator.to_string());
                }
            }
        }
        Ok(aggregates)
    }
}

/// A channel reported last round opens its next window at last round's
/// timestamp; a channel that was skipped keeps its window start.
fn carry_forward_valid_after_seconds(
    previous_outcome: &Outcome,
) -> PluginResult<BTreeMap<ChannelId, u32>> {
    let previous_timestamp_seconds = previous_outcome.observations_timestamp_seconds()?;
    Ok(previous_outcome
        .valid_after_seconds
        .iter()
        .map(|(&channel_id, &valid_after_seconds)| {
            if previous_outcome.is_reportable(channel_id).is_ok() {
                (channel_id, previous_timestamp_seconds)
            } else {
                (channel_id, valid_after_seconds)
            }
        })
        .collect())
}

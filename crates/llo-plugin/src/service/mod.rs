//! Plugin Service - the LLO round state machine
//!
//! # Architecture
//! - Observation: per-node view, fans out one data source request per stream
//! - Outcome: deterministic fold of >= 2f+1 observations, no I/O
//! - Reports: pure derivation of encoded reports from one outcome
//!
//! The previous outcome is the only state carried between rounds. The plugin
//! itself holds nothing mutable beyond its construction-time configuration.

mod observation;
mod outcome;
mod reports;


use crate::codec::{ObservationCodec, OutcomeCodec};
use crate::config::PluginConfig;
use crate::domain::ReportWithInfo;
use crate::error::{PluginError, PluginResult};
use crate::ports::{
    AttributedObservation, ChannelDefinitionCache, DataSource, OutcomeContext,
    PredecessorRetirementReportCache, Quorum, ReportCodec, ReportingPlugin, ShouldRetireCache,
    SystemTimeSource, TimeSource,
};
use async_trait::async_trait;
use llo_types::{ConfigDigest, OracleId, ReportFormat};
use std::collections::HashMap;
use std::sync::Arc;

/// Report encoders keyed by the format they produce
pub type ReportCodecs = HashMap<ReportFormat, Arc<dyn ReportCodec>>;

/// Identity of one protocol instance, fixed for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceParams {
    pub config_digest: ConfigDigest,
    /// Instance this one takes over from, if any
    pub predecessor_config_digest: Option<ConfigDigest>,
    pub oracle_id: OracleId,
    /// Maximum number of faulty oracles
    pub f: usize,
}

/// LLO reporting plugin
pub struct Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    params: InstanceParams,
    data_source: Arc<D>,
    channel_definition_cache: Arc<C>,
    should_retire_cache: Arc<S>,
    predecessor_retirement_report_cache: Arc<P>,
    report_codecs: ReportCodecs,
    config: PluginConfig,
    observation_codec: ObservationCodec,
    outcome_codec: OutcomeCodec,
    time_source: Box<dyn TimeSource>,
}

/// Dependencies for Plugin
pub struct PluginDependencies<D, C, S, P> {
    pub data_source: Arc<D>,
    pub channel_definition_cache: Arc<C>,
    pub should_retire_cache: Arc<S>,
    pub predecessor_retirement_report_cache: Arc<P>,
    pub report_codecs: ReportCodecs,
    pub config: PluginConfig,
}

impl<D, C, S, P> Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    pub fn new(deps: PluginDependencies<D, C, S, P>, params: InstanceParams) -> Self {
        Self {
            params,
            data_source: deps.data_source,
            channel_definition_cache: deps.channel_definition_cache,
            should_retire_cache: deps.should_retire_cache,
            predecessor_retirement_report_cache: deps.predecessor_retirement_report_cache,
            report_codecs: deps.report_codecs,
            config: deps.config,
            observation_codec: ObservationCodec,
            outcome_codec: OutcomeCodec,
            time_source: Box::new(SystemTimeSource),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn params(&self) -> &InstanceParams {
        &self.params
    }

    fn f(&self) -> usize {
        self.params.f
    }
}

#[async_trait]
impl<D, C, S, P> ReportingPlugin for Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    fn query(&self, _outctx: &OutcomeContext) -> PluginResult<Vec<u8>> {
        // No leader-driven coordination
        Ok(Vec::new())
    }

    async fn observation(&self, outctx: &OutcomeContext, query: &[u8]) -> PluginResult<Vec<u8>> {
        self.make_observation(outctx, query).await
    }

    fn validate_observation(
        &self,
        outctx: &OutcomeContext,
        _query: &[u8],
        ao: &AttributedObservation,
    ) -> PluginResult<()> {
        self.check_observation(outctx, ao)
    }

    fn observation_quorum(&self, _outctx: &OutcomeContext, _query: &[u8]) -> Quorum {
        Quorum::TwoFPlusOne
    }

    fn outcome(
        &self,
        outctx: &OutcomeContext,
        _query: &[u8],
        aos: &[AttributedObservation],
    ) -> PluginResult<Vec<u8>> {
        self.make_outcome(outctx, aos)
    }

    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> PluginResult<Vec<ReportWithInfo>> {
        self.make_reports(seq_nr, outcome)
    }

    async fn should_accept_attested_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> PluginResult<bool> {
        Ok(true)
    }

    async fn should_transmit_accepted_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> PluginResult<bool> {
        Ok(true)
    }

    fn close(&self) -> PluginResult<()> {
        Ok(())
    }
}

/// First sequence number is 1; 0 never occurs in a healthy transport.
fn ensure_valid_seq_nr(seq_nr: u64) -> PluginResult<()> {
    if seq_nr < 1 {
        return Err(PluginError::InvalidSeqNr { seq_nr });
    }
    Ok(())
}

//! Driving ports (Inbound API)
//!
//! The consensus transport drives a reporting plugin once per sequence
//! number. Observation and outcome payloads are opaque bytes at this
//! boundary.

use crate::domain::ReportWithInfo;
use crate::error::PluginResult;
use async_trait::async_trait;
use llo_types::{ConfigDigest, OracleId};

/// Round context handed to every callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutcomeContext {
    pub seq_nr: u64,
    /// Encoded outcome of round `seq_nr - 1`; empty for the first round
    pub previous_outcome: Vec<u8>,
    pub epoch: u64,
    pub round: u64,
}

/// An observation together with the oracle that made it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributedObservation {
    pub observation: Vec<u8>,
    pub observer: OracleId,
}

/// Number of observations the transport must collect before Outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quorum {
    /// More than two thirds of participants
    TwoFPlusOne,
}

impl Quorum {
    pub fn threshold(self, f: usize) -> usize {
        match self {
            Quorum::TwoFPlusOne => 2 * f + 1,
        }
    }
}

/// Per-instance configuration supplied by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginConfig {
    pub config_digest: ConfigDigest,
    pub oracle_id: OracleId,
    /// Number of oracles
    pub n: usize,
    /// Maximum number of faulty oracles
    pub f: usize,
    pub onchain_config: Vec<u8>,
    pub offchain_config: Vec<u8>,
}

/// Transport-enforced payload bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportingPluginLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginInfo {
    pub name: String,
    pub limits: ReportingPluginLimits,
}

/// Reporting plugin API
///
/// Callbacks for one round never run concurrently. `outcome` and `reports`
/// must not perform I/O.
#[async_trait]
pub trait ReportingPlugin: Send + Sync {
    fn query(&self, outctx: &OutcomeContext) -> PluginResult<Vec<u8>>;

    async fn observation(&self, outctx: &OutcomeContext, query: &[u8]) -> PluginResult<Vec<u8>>;

    /// An error rejects the observation; it is not counted towards quorum.
    fn validate_observation(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
        ao: &AttributedObservation,
    ) -> PluginResult<()>;

    fn observation_quorum(&self, outctx: &OutcomeContext, query: &[u8]) -> Quorum;

    fn outcome(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
        aos: &[AttributedObservation],
    ) -> PluginResult<Vec<u8>>;

    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> PluginResult<Vec<ReportWithInfo>>;

    async fn should_accept_attested_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> PluginResult<bool>;

    async fn should_transmit_accepted_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> PluginResult<bool>;

    fn close(&self) -> PluginResult<()>;
}

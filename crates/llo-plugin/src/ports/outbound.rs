//! Driven ports (Outbound dependencies)

use crate::domain::{Report, RetirementReport, StreamValues};
use crate::error::PortError;
use async_trait::async_trait;
use llo_types::{ChannelDefinition, ChannelDefinitions, ConfigDigest, OracleId};

/// Options passed to every data source request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DsOpts {
    pub verbose_logging: bool,
    pub seq_nr: u64,
}

/// Source of observed stream values
///
/// For every key present in `stream_values` on entry, either fill in a value
/// or leave it `None`. Keys must not be added or removed. Timeouts are the
/// implementation's responsibility.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn observe(&self, stream_values: &mut StreamValues, opts: DsOpts)
        -> Result<(), PortError>;
}

/// Authoritative channel definitions, usually backed by an on-chain log
/// poller. Snapshots must be internally valid.
pub trait ChannelDefinitionCache: Send + Sync {
    fn definitions(&self) -> ChannelDefinitions;
}

/// Operator signal that this protocol instance should retire.
pub trait ShouldRetireCache: Send + Sync {
    fn should_retire(&self) -> Result<bool, PortError>;
}

/// Store of attested retirement reports produced by predecessor instances
#[async_trait]
pub trait PredecessorRetirementReportCache: Send + Sync {
    /// `Ok(None)` when no report is known yet.
    async fn attested_retirement_report(
        &self,
        predecessor: ConfigDigest,
    ) -> Result<Option<Vec<u8>>, PortError>;

    /// Re-verifies the attestation over `attested` and returns the decoded
    /// report. Called from Outcome, so it must not block.
    fn check_attested_retirement_report(
        &self,
        predecessor: ConfigDigest,
        attested: &[u8],
    ) -> Result<RetirementReport, PortError>;
}

/// Per-format report encoder. One-directional.
pub trait ReportCodec: Send + Sync {
    fn encode(&self, report: &Report, definition: &ChannelDefinition) -> Result<Vec<u8>, PortError>;
}

/// Verifies a single oracle's signature over an attested retirement report.
pub trait RetirementReportVerifier: Send + Sync {
    fn verify(
        &self,
        config_digest: ConfigDigest,
        seq_nr: u64,
        report: &[u8],
        signer: OracleId,
        signature: &[u8],
    ) -> bool;
}

/// Time source for observation timestamps
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in nanoseconds
    fn now_nanos(&self) -> i64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_nanos(&self) -> i64 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }
}

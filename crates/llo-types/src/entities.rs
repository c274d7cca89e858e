//! # Core Protocol Entities
//!
//! ## Clusters
//!
//! - **Identity**: `StreamId`, `ChannelId`, `OracleId`, `ConfigDigest`
//! - **Channels**: `ChannelDefinition`, `StreamDefinition`, `Aggregator`, `ReportFormat`
//! - **Lifecycle**: `LifeCycleStage`, `ReportInfo`

use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of a single observable quantity.
pub type StreamId = u32;

/// Identifier of a channel (one report feed).
pub type ChannelId = u32;

/// Index of an oracle within a protocol configuration.
pub type OracleId = u8;

/// Cryptographic identifier of one protocol configuration epoch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ConfigDigest(pub [u8; 32]);

impl ConfigDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ConfigDigest {
    type Error = TypesError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidConfigDigestLength(bytes.len()))?;
        Ok(Self(digest))
    }
}

impl fmt::Display for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigDigest({})", self)
    }
}

// =============================================================================
// CLUSTER B: CHANNELS
// =============================================================================

/// Encoding used for a channel's reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum ReportFormat {
    /// EVM premium legacy report (bid/benchmark/ask).
    EvmPremiumLegacy = 1,
    /// JSON report.
    Json = 2,
    /// Reserved for retirement reports; never a valid channel format.
    Retirement = 3,
}

impl ReportFormat {
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ReportFormat {
    type Error = TypesError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::EvmPremiumLegacy),
            2 => Ok(Self::Json),
            3 => Ok(Self::Retirement),
            other => Err(TypesError::UnknownReportFormat(other)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EvmPremiumLegacy => "evm_premium_legacy",
            Self::Json => "json",
            Self::Retirement => "retirement",
        };
        f.write_str(name)
    }
}

/// Aggregation policy for one stream within a channel.
///
/// Id 0 is kept representable so that definitions carrying an
/// uninitialised aggregator can be detected and rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Aggregator {
    /// Uninitialised aggregator id; always invalid.
    Unspecified = 0,
    /// Upper median over decimal values.
    Median = 1,
    /// Most frequent value (reserved).
    Mode = 2,
    /// Component-wise upper median over valid quotes.
    Quote = 3,
}

impl Aggregator {
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Aggregator {
    type Error = TypesError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::Median),
            2 => Ok(Self::Mode),
            3 => Ok(Self::Quote),
            other => Err(TypesError::UnknownAggregator(other)),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "unspecified",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::Quote => "quote",
        };
        f.write_str(name)
    }
}

/// A stream referenced by a channel, with the aggregator applied to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub stream_id: StreamId,
    pub aggregator: Aggregator,
}

impl StreamDefinition {
    pub fn new(stream_id: StreamId, aggregator: Aggregator) -> Self {
        Self {
            stream_id,
            aggregator,
        }
    }
}

/// Definition of a channel: which streams feed it and how it is encoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub report_format: ReportFormat,
    /// Destination chain of the reports.
    pub chain_selector: u64,
    /// Streams in report order.
    pub streams: Vec<StreamDefinition>,
    /// Opaque per-format parameters (fees, multipliers, ...).
    pub opts: Vec<u8>,
}

impl ChannelDefinition {
    pub fn new(report_format: ReportFormat, streams: Vec<StreamDefinition>) -> Self {
        Self {
            report_format,
            chain_selector: 0,
            streams,
            opts: Vec::new(),
        }
    }

    pub fn with_chain_selector(mut self, chain_selector: u64) -> Self {
        self.chain_selector = chain_selector;
        self
    }

    pub fn with_opts(mut self, opts: Vec<u8>) -> Self {
        self.opts = opts;
        self
    }
}

/// All channels keyed by id, in ascending id order.
pub type ChannelDefinitions = BTreeMap<ChannelId, ChannelDefinition>;

// =============================================================================
// CLUSTER C: LIFECYCLE
// =============================================================================

/// Where a protocol instance is in its handover lifecycle.
///
/// Transitions are `Staging -> Production -> Retired` only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeCycleStage {
    Staging,
    Production,
    Retired,
}

impl LifeCycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for LifeCycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifeCycleStage {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "retired" => Ok(Self::Retired),
            other => Err(TypesError::UnknownLifeCycleStage(other.to_string())),
        }
    }
}

/// Routing information attached to every generated report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub life_cycle_stage: LifeCycleStage,
    pub report_format: ReportFormat,
}

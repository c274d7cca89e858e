//! # Simulated Oracle Network
//!
//! Drives real plugin instances through the round protocol the way a BFT
//! transport would: every node observes, observations are validated, every
//! node computes the outcome from the same observation set (each in a
//! different order), and the outcomes and reports must be byte-identical.
//!
//! A [`Deployment`] holds what protocol instances share: the market feed,
//! the clock and the retirement report store. Each [`Instance`] is one
//! protocol instance (one config digest) with its own set of nodes.

use async_trait::async_trait;
use llo_plugin::adapters::{
    AttestedRetirementReport, AttributedSignature, InMemoryRetirementReportCache,
    StaticChannelDefinitionCache, StaticShouldRetireCache,
};
use llo_plugin::{
    AttributedObservation, CodecError, DataSource, DsOpts, OffchainConfig, Outcome,
    OutcomeCodec, OutcomeContext, Plugin, PluginConfig, PluginDependencies, PluginError,
    PluginFactory, PortError, Report, ReportCodec, ReportCodecs, ReportWithInfo,
    ReportingPlugin, ReportingPluginConfig, RetirementReportVerifier, StreamValue, StreamValues,
    TimeSource,
};
use llo_telemetry::round_span;
use llo_types::{
    ChannelDefinition, ChannelDefinitions, ChannelId, ConfigDigest, OracleId, ReportFormat,
    StreamId,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Unix time the simulated clock starts at.
pub const GENESIS_SECONDS: i64 = 1_700_000_000;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Only {valid} valid observations in round {seq_nr}, need {need}")]
    NoQuorum {
        seq_nr: u64,
        valid: usize,
        need: usize,
    },

    #[error("Nodes disagree on the outcome of round {seq_nr}")]
    OutcomeDivergence { seq_nr: u64 },

    #[error("Nodes disagree on the reports of round {seq_nr}")]
    ReportDivergence { seq_nr: u64 },
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Wall clock shared by every node of a deployment.
pub struct SimulatedClock {
    now_nanos: AtomicI64,
}

impl SimulatedClock {
    pub fn new(start_seconds: i64) -> Self {
        Self {
            now_nanos: AtomicI64::new(start_seconds * NANOS_PER_SECOND),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now_nanos
            .fetch_add(seconds * NANOS_PER_SECOND, Ordering::SeqCst);
    }

    pub fn now_nanos(&self) -> i64 {
        self.now_nanos.load(Ordering::SeqCst)
    }
}

/// A node's view of the shared clock, a few milliseconds off.
struct NodeClock {
    clock: Arc<SimulatedClock>,
    skew_nanos: i64,
}

impl TimeSource for NodeClock {
    fn now_nanos(&self) -> i64 {
        self.clock.now_nanos() + self.skew_nanos
    }
}

/// Market values every node reads from.
#[derive(Default)]
pub struct PriceFeed {
    values: RwLock<HashMap<StreamId, StreamValue>>,
}

impl PriceFeed {
    pub fn set(&self, stream_id: StreamId, value: StreamValue) {
        self.values.write().insert(stream_id, value);
    }
}

/// Per-node data source; can be taken offline independently.
pub struct NodeDataSource {
    feed: Arc<PriceFeed>,
    offline: AtomicBool,
}

impl NodeDataSource {
    fn new(feed: Arc<PriceFeed>) -> Self {
        Self {
            feed,
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for NodeDataSource {
    async fn observe(
        &self,
        stream_values: &mut StreamValues,
        _opts: DsOpts,
    ) -> Result<(), PortError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("data source offline".to_string()));
        }
        let feed = self.feed.values.read();
        for (stream_id, value) in stream_values.iter_mut() {
            *value = feed.get(stream_id).cloned();
        }
        Ok(())
    }
}

/// Report as emitted by [`JsonReportCodec`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub config_digest: String,
    pub seq_nr: u64,
    pub channel_id: ChannelId,
    pub valid_after_seconds: u32,
    pub observation_timestamp_seconds: u32,
    pub values: Vec<String>,
    pub specimen: bool,
}

impl JsonReport {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

pub struct JsonReportCodec;

impl ReportCodec for JsonReportCodec {
    fn encode(&self, report: &Report, _definition: &ChannelDefinition) -> Result<Vec<u8>, PortError> {
        let json = JsonReport {
            config_digest: report.config_digest.to_string(),
            seq_nr: report.seq_nr,
            channel_id: report.channel_id,
            valid_after_seconds: report.valid_after_seconds,
            observation_timestamp_seconds: report.observation_timestamp_seconds,
            values: report.values.iter().map(StreamValue::marshal_text).collect(),
            specimen: report.specimen,
        };
        serde_json::to_vec(&json).map_err(|e| PortError::Encoding(e.to_string()))
    }
}

/// Signatures are SHA-256 over a per-oracle key and the signed payload.
pub struct KeyedVerifier;

impl KeyedVerifier {
    pub fn sign(signer: OracleId, config_digest: ConfigDigest, seq_nr: u64, report: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"llo-test-oracle-key");
        hasher.update([signer]);
        hasher.update(config_digest.as_bytes());
        hasher.update(seq_nr.to_be_bytes());
        hasher.update(report);
        hasher.finalize().to_vec()
    }
}

impl RetirementReportVerifier for KeyedVerifier {
    fn verify(
        &self,
        config_digest: ConfigDigest,
        seq_nr: u64,
        report: &[u8],
        signer: OracleId,
        signature: &[u8],
    ) -> bool {
        Self::sign(signer, config_digest, seq_nr, report) == signature
    }
}

pub type RetirementReports = InMemoryRetirementReportCache<KeyedVerifier>;

pub type NodePlugin =
    Plugin<NodeDataSource, StaticChannelDefinitionCache, StaticShouldRetireCache, RetirementReports>;

// =============================================================================
// DEPLOYMENT
// =============================================================================

/// State shared by all protocol instances of one simulated DON.
pub struct Deployment {
    pub clock: Arc<SimulatedClock>,
    pub feed: Arc<PriceFeed>,
    pub retirement_reports: Arc<RetirementReports>,
}

impl Default for Deployment {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployment {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SimulatedClock::new(GENESIS_SECONDS)),
            feed: Arc::new(PriceFeed::default()),
            retirement_reports: Arc::new(InMemoryRetirementReportCache::new(Arc::new(KeyedVerifier))),
        }
    }

    /// Start a protocol instance of `n` nodes tolerating `f` faults.
    pub fn instance(
        &self,
        config_digest: ConfigDigest,
        n: usize,
        f: usize,
        predecessor: Option<ConfigDigest>,
    ) -> Result<Instance, NetworkError> {
        let offchain_config = OffchainConfig::new(predecessor).encode()?;
        self.retirement_reports.register_config(config_digest, f);

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let oracle_id = OracleId::try_from(i).map_err(|_| PluginError::InvalidConfig {
                reason: format!("oracle index {} out of range", i),
            })?;
            nodes.push(self.node(oracle_id, n, f, config_digest, &offchain_config)?);
        }

        debug!(config_digest = %config_digest, n, f, "[llo] Started simulated instance");

        Ok(Instance {
            config_digest,
            f,
            nodes,
            silent: BTreeSet::new(),
            seq_nr: 0,
            previous_outcome: Vec::new(),
        })
    }

    fn node(
        &self,
        oracle_id: OracleId,
        n: usize,
        f: usize,
        config_digest: ConfigDigest,
        offchain_config: &[u8],
    ) -> Result<Node, NetworkError> {
        let data_source = Arc::new(NodeDataSource::new(Arc::clone(&self.feed)));
        let channels = Arc::new(StaticChannelDefinitionCache::default());
        let should_retire = Arc::new(StaticShouldRetireCache::default());

        let mut report_codecs: ReportCodecs = HashMap::new();
        report_codecs.insert(ReportFormat::Json, Arc::new(JsonReportCodec));

        let factory = PluginFactory::new(PluginDependencies {
            data_source: Arc::clone(&data_source),
            channel_definition_cache: Arc::clone(&channels),
            should_retire_cache: Arc::clone(&should_retire),
            predecessor_retirement_report_cache: Arc::clone(&self.retirement_reports),
            report_codecs,
            config: PluginConfig {
                verbose_logging: true,
            },
        });

        let (plugin, _info) = factory.new_reporting_plugin(&ReportingPluginConfig {
            config_digest,
            oracle_id,
            n,
            f,
            onchain_config: Vec::new(),
            offchain_config: offchain_config.to_vec(),
        })?;

        let plugin = plugin.with_time_source(Box::new(NodeClock {
            clock: Arc::clone(&self.clock),
            skew_nanos: i64::from(oracle_id) * 1_000_000,
        }));

        Ok(Node {
            oracle_id,
            plugin,
            data_source,
            channels,
            should_retire,
        })
    }

    /// Make an attested retirement report available to successors.
    pub fn publish_retirement(&self, attested: &AttestedRetirementReport) -> Result<(), NetworkError> {
        self.retirement_reports
            .store_attested_retirement_report(attested)?;
        Ok(())
    }
}

pub struct Node {
    pub oracle_id: OracleId,
    pub plugin: NodePlugin,
    pub data_source: Arc<NodeDataSource>,
    pub channels: Arc<StaticChannelDefinitionCache>,
    pub should_retire: Arc<StaticShouldRetireCache>,
}

/// Result of one completed round.
pub struct Round {
    pub seq_nr: u64,
    pub outcome: Outcome,
    pub reports: Vec<ReportWithInfo>,
}

impl Round {
    /// Channel reports decoded, in emission order. Retirement reports are
    /// skipped.
    pub fn json_reports(&self) -> Vec<JsonReport> {
        self.reports
            .iter()
            .filter(|r| r.info.report_format == ReportFormat::Json)
            .filter_map(|r| JsonReport::decode(&r.report).ok())
            .collect()
    }

    pub fn retirement_report(&self) -> Option<&ReportWithInfo> {
        self.reports
            .iter()
            .find(|r| r.info.report_format == ReportFormat::Retirement)
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

pub struct Instance {
    pub config_digest: ConfigDigest,
    pub f: usize,
    pub nodes: Vec<Node>,
    /// Nodes whose observations never reach the transport
    silent: BTreeSet<OracleId>,
    seq_nr: u64,
    previous_outcome: Vec<u8>,
}

impl Instance {
    pub fn seq_nr(&self) -> u64 {
        self.seq_nr
    }

    /// Set the authoritative channel set on every node.
    pub fn set_channels(&self, definitions: &ChannelDefinitions) {
        for node in &self.nodes {
            node.channels.set_definitions(definitions.clone());
        }
    }

    /// Set the authoritative channel set on the given nodes only.
    pub fn set_channels_on(&self, oracle_ids: &[OracleId], definitions: &ChannelDefinitions) {
        for node in self.nodes.iter().filter(|n| oracle_ids.contains(&n.oracle_id)) {
            node.channels.set_definitions(definitions.clone());
        }
    }

    pub fn set_should_retire(&self, should_retire: bool) {
        for node in &self.nodes {
            node.should_retire.set(should_retire);
        }
    }

    pub fn silence(&mut self, oracle_id: OracleId) {
        self.silent.insert(oracle_id);
    }

    pub fn outcome_context(&self, seq_nr: u64, previous_outcome: Vec<u8>) -> OutcomeContext {
        OutcomeContext {
            seq_nr,
            previous_outcome,
            epoch: 1,
            round: seq_nr,
        }
    }

    /// Observations of every node that is not silenced.
    pub async fn observe_all(
        &self,
        outctx: &OutcomeContext,
    ) -> Result<Vec<AttributedObservation>, NetworkError> {
        let mut aos = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.iter().filter(|n| !self.silent.contains(&n.oracle_id)) {
            aos.push(AttributedObservation {
                observation: node.plugin.observation(outctx, &[]).await?,
                observer: node.oracle_id,
            });
        }
        Ok(aos)
    }

    pub async fn run_round(&mut self) -> Result<Round, NetworkError> {
        let seq_nr = self.seq_nr + 1;
        let outctx = self.outcome_context(seq_nr, self.previous_outcome.clone());

        let aos = self.observe_all(&outctx).await?;

        let leader = &self.nodes[0].plugin;
        let accepted: Vec<AttributedObservation> = aos
            .into_iter()
            .filter(|ao| leader.validate_observation(&outctx, &[], ao).is_ok())
            .collect();
        let need = leader.observation_quorum(&outctx, &[]).threshold(self.f);
        if accepted.len() < need {
            return Err(NetworkError::NoQuorum {
                seq_nr,
                valid: accepted.len(),
                need,
            });
        }

        let outcome = {
            let _span = round_span!(seq_nr, "Outcome", config_digest = %self.config_digest).entered();
            let mut outcomes = Vec::with_capacity(self.nodes.len());
            for (i, node) in self.nodes.iter().enumerate() {
                let mut view = accepted.clone();
                let len = view.len();
                view.rotate_left(i % len);
                outcomes.push(node.plugin.outcome(&outctx, &[], &view)?);
            }
            if outcomes.windows(2).any(|w| w[0] != w[1]) {
                return Err(NetworkError::OutcomeDivergence { seq_nr });
            }
            outcomes.swap_remove(0)
        };

        let reports = {
            let _span = round_span!(seq_nr, "Report", config_digest = %self.config_digest).entered();
            let mut all_reports = Vec::with_capacity(self.nodes.len());
            for node in &self.nodes {
                all_reports.push(node.plugin.reports(seq_nr, &outcome)?);
            }
            if all_reports.windows(2).any(|w| w[0] != w[1]) {
                return Err(NetworkError::ReportDivergence { seq_nr });
            }
            all_reports.swap_remove(0)
        };

        let decoded = OutcomeCodec.decode(&outcome)?;
        self.seq_nr = seq_nr;
        self.previous_outcome = outcome;

        Ok(Round {
            seq_nr,
            outcome: decoded,
            reports,
        })
    }

    /// Sign a report with the first `signers` nodes.
    pub fn attest(&self, seq_nr: u64, report: &ReportWithInfo, signers: usize) -> AttestedRetirementReport {
        let signatures = self
            .nodes
            .iter()
            .take(signers)
            .map(|node| AttributedSignature {
                signer: node.oracle_id,
                signature: KeyedVerifier::sign(node.oracle_id, self.config_digest, seq_nr, &report.report),
            })
            .collect();
        AttestedRetirementReport {
            config_digest: self.config_digest,
            seq_nr,
            report: report.report.clone(),
            signatures,
        }
    }
}

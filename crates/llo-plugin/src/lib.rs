//! # llo-plugin
//!
//! Low-Latency Oracle reporting plugin for a BFT consensus transport.
//!
//! ## Overview
//!
//! This crate provides:
//! - **Four-phase state machine**: Query → Observation → Outcome → Reports
//! - **Quorum voting**: channel additions and removals need more than f votes
//! - **Aggregation**: upper-median over decimals and bid/benchmark/ask quotes
//! - **Deterministic codecs**: byte-identical outcomes on every honest node
//! - **Blue/green handover**: staging → production → retired, with the
//!   retiring instance's validity windows carried to its successor
//!
//! ## Architecture
//!
//! ```text
//! Consensus transport
//!        │ OutcomeContext, AttributedObservation
//!        ▼
//!   ReportingPlugin (service)
//!        ├── DataSource ───────────────────── observed stream values
//!        ├── ChannelDefinitionCache ───────── authoritative channel set
//!        ├── ShouldRetireCache ────────────── operator retirement signal
//!        ├── PredecessorRetirementReportCache  attested handover evidence
//!        └── ReportCodec (per format) ─────── encoded reports
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! [STAGING] ──valid predecessor retirement report──→ [PRODUCTION] ──should_retire > f──→ [RETIRED]
//! ```
//!
//! Staging and retired instances emit specimen reports only; a retired
//! instance additionally emits one retirement report per round.
//!
//! ## Example
//!
//! ```rust,ignore
//! use llo_plugin::{PluginDependencies, PluginFactory, ReportingPlugin};
//!
//! let factory = PluginFactory::new(deps);
//! let (plugin, info) = factory.new_reporting_plugin(&reporting_plugin_config)?;
//!
//! let observation = plugin.observation(&outctx, &[]).await?;
//! let outcome = plugin.outcome(&outctx, &[], &attributed_observations)?;
//! let reports = plugin.reports(outctx.seq_nr, &outcome)?;
//! ```

pub mod adapters;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod ports;
pub mod service;

pub use codec::{
    decode_retirement_report, encode_retirement_report, CodecError, CodecResult,
    ObservationCodec, OffchainConfig, OutcomeCodec,
};
pub use config::PluginConfig;
pub use domain::{
    Decimal, Observation, Outcome, Quote, Report, ReportWithInfo, RetirementReport, StreamValue,
    StreamValues,
};
pub use error::{PluginError, PluginResult, PortError};
pub use factory::{PluginFactory, PLUGIN_NAME};
pub use ports::{
    AttributedObservation, ChannelDefinitionCache, DataSource, DsOpts, OutcomeContext,
    PredecessorRetirementReportCache, Quorum, ReportCodec, ReportingPlugin,
    ReportingPluginConfig, ReportingPluginInfo, ReportingPluginLimits, RetirementReportVerifier,
    ShouldRetireCache, SystemTimeSource, TimeSource,
};
pub use service::{InstanceParams, Plugin, PluginDependencies, ReportCodecs};

//! Report entities
//!
//! `Report` is handed to the per-format encoder. `RetirementReport` is the
//! only state passed from a retiring instance to its successor.

use super::stream_value::StreamValue;
use llo_types::{ChannelId, ConfigDigest, ReportInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub config_digest: ConfigDigest,
    /// Sequence number of the round that produced this report
    pub seq_nr: u64,
    pub channel_id: ChannelId,
    /// Report is only valid for t > valid_after_seconds
    pub valid_after_seconds: u32,
    /// Median of the observation timestamps, in seconds
    pub observation_timestamp_seconds: u32,
    /// One value per channel stream, in declared order
    pub values: Vec<StreamValue>,
    /// Set by non-production instances; never settles on chain
    pub specimen: bool,
}

/// Validity handover state of a retiring protocol instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetirementReport {
    pub valid_after_seconds: BTreeMap<ChannelId, u32>,
}

/// An encoded report plus routing information for the transmitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportWithInfo {
    pub report: Vec<u8>,
    pub info: ReportInfo,
}

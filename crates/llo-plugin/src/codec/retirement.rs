//! Retirement report codec
//!
//! The retirement report is consumed by a successor instance that may run a
//! different build, so it uses a self-describing JSON encoding rather than
//! the positional wire format.

use super::CodecResult;
use crate::domain::RetirementReport;

pub fn encode_retirement_report(report: &RetirementReport) -> CodecResult<Vec<u8>> {
    Ok(serde_json::to_vec(report)?)
}

pub fn decode_retirement_report(bytes: &[u8]) -> CodecResult<RetirementReport> {
    Ok(serde_json::from_slice(bytes)?)
}

//! Predecessor Retirement Report Cache Adapters
//!
//! A retiring instance emits a retirement report which its transmitter signs
//! and stores here as an [`AttestedRetirementReport`]. The successor fetches
//! the attested bytes during Observation and re-verifies them in Outcome.

use crate::codec::{decode_retirement_report, wire_options, CodecResult};
use crate::domain::RetirementReport;
use crate::error::PortError;
use crate::ports::{PredecessorRetirementReportCache, RetirementReportVerifier};
use async_trait::async_trait;
use bincode::Options;
use llo_types::{ConfigDigest, OracleId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_ATTESTED_RETIREMENT_REPORT_LENGTH: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedSignature {
    pub signer: OracleId,
    pub signature: Vec<u8>,
}

/// Retirement report plus the signatures of the instance that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedRetirementReport {
    /// Digest of the retiring instance
    pub config_digest: ConfigDigest,
    pub seq_nr: u64,
    /// JSON-encoded retirement report
    pub report: Vec<u8>,
    pub signatures: Vec<AttributedSignature>,
}

impl AttestedRetirementReport {
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(wire_options(MAX_ATTESTED_RETIREMENT_REPORT_LENGTH).serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        Ok(wire_options(MAX_ATTESTED_RETIREMENT_REPORT_LENGTH).deserialize(bytes)?)
    }
}

/// Retirement reports and fault tolerances of known predecessor instances.
pub struct InMemoryRetirementReportCache<V: RetirementReportVerifier> {
    verifier: Arc<V>,
    /// f of each known instance
    fault_tolerances: RwLock<HashMap<ConfigDigest, usize>>,
    attested_reports: RwLock<HashMap<ConfigDigest, Vec<u8>>>,
}

impl<V: RetirementReportVerifier> InMemoryRetirementReportCache<V> {
    pub fn new(verifier: Arc<V>) -> Self {
        Self {
            verifier,
            fault_tolerances: RwLock::new(HashMap::new()),
            attested_reports: RwLock::new(HashMap::new()),
        }
    }

    /// Record the fault tolerance of an instance so its attestations can be
    /// checked later.
    pub fn register_config(&self, config_digest: ConfigDigest, f: usize) {
        self.fault_tolerances.write().insert(config_digest, f);
    }

    pub fn store_attested_retirement_report(
        &self,
        attested: &AttestedRetirementReport,
    ) -> CodecResult<()> {
        let encoded = attested.encode()?;
        info!(
            config_digest = %attested.config_digest,
            seq_nr = attested.seq_nr,
            "[llo] Stored attested retirement report"
        );
        self.attested_reports
            .write()
            .insert(attested.config_digest, encoded);
        Ok(())
    }
}

#[async_trait]
impl<V: RetirementReportVerifier> PredecessorRetirementReportCache
    for InMemoryRetirementReportCache<V>
{
    async fn attested_retirement_report(
        &self,
        predecessor: ConfigDigest,
    ) -> Result<Option<Vec<u8>>, PortError> {
        Ok(self.attested_reports.read().get(&predecessor).cloned())
    }

    fn check_attested_retirement_report(
        &self,
        predecessor: ConfigDigest,
        attested: &[u8],
    ) -> Result<RetirementReport, PortError> {
        let attested = AttestedRetirementReport::decode(attested)
            .map_err(|e| PortError::Verification(format!("malformed attestation: {}", e)))?;

        if attested.config_digest != predecessor {
            return Err(PortError::Verification(format!(
                "attestation is for {}, expected {}",
                attested.config_digest, predecessor
            )));
        }

        let f = self
            .fault_tolerances
            .read()
            .get(&predecessor)
            .copied()
            .ok_or_else(|| {
                PortError::Unavailable(format!("no config known for predecessor {}", predecessor))
            })?;

        let valid_signers: BTreeSet<OracleId> = attested
            .signatures
            .iter()
            .filter(|s| {
                self.verifier.verify(
                    attested.config_digest,
                    attested.seq_nr,
                    &attested.report,
                    s.signer,
                    &s.signature,
                )
            })
            .map(|s| s.signer)
            .collect();

        if valid_signers.len() <= f {
            return Err(PortError::Verification(format!(
                "not enough valid signatures: {} valid, need more than {}",
                valid_signers.len(),
                f
            )));
        }

        debug!(
            predecessor = %predecessor,
            signers = valid_signers.len(),
            "[llo] Attested retirement report verified"
        );

        decode_retirement_report(&attested.report)
            .map_err(|e| PortError::Verification(format!("malformed retirement report: {}", e)))
    }
}

/// For instances without a predecessor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRetirementReportCache;

#[async_trait]
impl PredecessorRetirementReportCache for NullRetirementReportCache {
    async fn attested_retirement_report(
        &self,
        _predecessor: ConfigDigest,
    ) -> Result<Option<Vec<u8>>, PortError> {
        Ok(None)
    }

    fn check_attested_retirement_report(
        &self,
        predecessor: ConfigDigest,
        _attested: &[u8],
    ) -> Result<RetirementReport, PortError> {
        Err(PortError::Verification(format!(
            "no retirement reports are accepted (predecessor {})",
            predecessor
        )))
    }
}

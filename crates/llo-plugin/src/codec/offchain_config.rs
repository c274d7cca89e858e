//! Offchain configuration carried in the protocol instance's config

use super::wire::wire_options;
use super::CodecResult;
use bincode::Options;
use llo_types::ConfigDigest;
use serde::{Deserialize, Serialize};

const MAX_OFFCHAIN_CONFIG_LENGTH: usize = 4096;

/// Offchain config of a protocol instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainConfig {
    /// Instance this one takes over from in a blue/green deployment
    pub predecessor_config_digest: Option<ConfigDigest>,
}

impl OffchainConfig {
    pub fn new(predecessor_config_digest: Option<ConfigDigest>) -> Self {
        Self {
            predecessor_config_digest,
        }
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(wire_options(MAX_OFFCHAIN_CONFIG_LENGTH).serialize(self)?)
    }

    /// Empty bytes mean no predecessor.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(wire_options(MAX_OFFCHAIN_CONFIG_LENGTH).deserialize(bytes)?)
    }
}

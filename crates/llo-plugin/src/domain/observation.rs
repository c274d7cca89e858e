//! Observation entity
//!
//! One node's view for one round. Created fresh every round and discarded
//! once folded into an outcome.

use super::stream_value::StreamValue;
use llo_types::{ChannelDefinitions, ChannelId, StreamId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    /// Attested retirement report of the predecessor instance, if fetched
    pub attested_predecessor_retirement: Vec<u8>,
    /// Vote to retire this protocol instance
    pub should_retire: bool,
    /// Taken immediately before any stream is observed
    pub unix_timestamp_nanoseconds: i64,
    /// Votes to remove channels
    pub remove_channel_ids: BTreeSet<ChannelId>,
    /// Votes to add or replace channels
    pub update_channel_definitions: ChannelDefinitions,
    /// Observed values; streams that failed are absent
    pub stream_values: BTreeMap<StreamId, StreamValue>,
}

impl Observation {
    /// True for the zero value, which is what the bootstrap round carries.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

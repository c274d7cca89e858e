//! Channel Definition Cache Adapter

use crate::ports::ChannelDefinitionCache;
use llo_types::{ChannelDefinition, ChannelDefinitions, ChannelId};
use parking_lot::RwLock;
use tracing::debug;

/// Holds a replaceable snapshot of the authoritative channel set.
#[derive(Default)]
pub struct StaticChannelDefinitionCache {
    definitions: RwLock<ChannelDefinitions>,
}

impl StaticChannelDefinitionCache {
    pub fn new(definitions: ChannelDefinitions) -> Self {
        Self {
            definitions: RwLock::new(definitions),
        }
    }

    /// Replace the whole snapshot.
    pub fn set_definitions(&self, definitions: ChannelDefinitions) {
        debug!("[llo] Replacing channel definitions ({} channels)", definitions.len());
        *self.definitions.write() = definitions;
    }

    pub fn upsert(&self, channel_id: ChannelId, definition: ChannelDefinition) {
        self.definitions.write().insert(channel_id, definition);
    }

    pub fn remove(&self, channel_id: ChannelId) -> Option<ChannelDefinition> {
        self.definitions.write().remove(&channel_id)
    }
}

impl ChannelDefinitionCache for StaticChannelDefinitionCache {
    fn definitions(&self) -> ChannelDefinitions {
        self.definitions.read().clone()
    }
}

//! Identifier mapping between broker topics and the store.
//!
//! Field devices are flashed with their own identifiers; the store may know
//! the same series or device under a different key. Keys without an entry
//! pass through unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, SeriesId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierMap {
    /// Topic series key → store series id.
    pub sensors: BTreeMap<String, SeriesId>,
    /// Topic device key → store device id.
    pub devices: BTreeMap<String, DeviceId>,
}

impl IdentifierMap {
    /// Store series for a topic key, or `None` if the key is not a valid id.
    #[must_use]
    pub fn series(&self, topic_key: &str) -> Option<SeriesId> {
        self.sensors
            .get(topic_key)
            .cloned()
            .or_else(|| SeriesId::new(topic_key).ok())
    }

    /// Store device for a topic key, or `None` if the key is not a valid id.
    #[must_use]
    pub fn device(&self, topic_key: &str) -> Option<DeviceId> {
        self.devices
            .get(topic_key)
            .cloned()
            .or_else(|| DeviceId::new(topic_key).ok())
    }

    /// Topic key a store device is addressed by on the broker.
    #[must_use]
    pub fn device_topic_key(&self, device: &DeviceId) -> DeviceId {
        self.devices
            .iter()
            .find(|(_, mapped)| *mapped == device)
            .and_then(|(key, _)| DeviceId::new(key.as_str()).ok())
            .unwrap_or_else(|| device.clone())
    }
}

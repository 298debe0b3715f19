//! Command: an actuation request addressed to one device.

use serde::{Deserialize, Serialize};

use crate::device::DeviceStatus;
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Requested switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    On,
    Off,
}

impl Action {
    /// Status a device ends up in after this action.
    #[must_use]
    pub fn resulting_status(self) -> DeviceStatus {
        match self {
            Self::On => DeviceStatus::Active,
            Self::Off => DeviceStatus::Inactive,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// Who caused a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// A human request arriving through the HTTP layer.
    ExternalApi,
    /// The predictive control loop.
    AutoControl,
    /// The device itself (e.g. a physical button press).
    DeviceEcho,
}

impl Origin {
    /// Tag written into the `source` field of outbound payloads.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::ExternalApi => "external-api",
            Self::AutoControl => "auto-control",
            Self::DeviceEcho => "device-echo",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// An actuation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub target_device_id: DeviceId,
    pub action: Action,
    pub resulting_status: DeviceStatus,
    pub issued_at: Timestamp,
    pub origin: Origin,
}

impl Command {
    /// Build a command; the resulting status follows from `action`.
    #[must_use]
    pub fn new(target: DeviceId, action: Action, origin: Origin, issued_at: Timestamp) -> Self {
        Self {
            target_device_id: target,
            action,
            resulting_status: action.resulting_status(),
            issued_at,
            origin,
        }
    }

    /// The wire representation published on the device's control topic.
    #[must_use]
    pub fn to_payload(&self) -> CommandPayload {
        CommandPayload {
            device_id: self.target_device_id.clone(),
            action: self.action,
            status: self.resulting_status,
            timestamp: self.issued_at,
            source: self.origin.tag().to_string(),
        }
    }
}

/// JSON body of an outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub device_id: DeviceId,
    pub action: Action,
    pub status: DeviceStatus,
    pub timestamp: Timestamp,
    /// Origin tag checked by the feedback guard when the message echoes back.
    pub source: String,
}

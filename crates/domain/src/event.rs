//! Event: an immutable record of something the bus did.
//!
//! Events are broadcast in-process so observers (logging, a future HTTP
//! push channel) can follow the bus without coupling to the router.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ReadingRecorded,
    PredictionComputed,
    CommandIssued,
    DeviceStatusChanged,
    AlertRaised,
    EchoSuppressed,
}

impl EventType {
    /// Stable string form, matching the serialized representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingRecorded => "reading_recorded",
            Self::PredictionComputed => "prediction_computed",
            Self::CommandIssued => "command_issued",
            Self::DeviceStatusChanged => "device_status_changed",
            Self::AlertRaised => "alert_raised",
            Self::EchoSuppressed => "echo_suppressed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    /// Series or device the event is about, if any.
    pub subject: Option<String>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, subject: Option<String>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            subject,
            data,
            timestamp: now(),
        }
    }
}

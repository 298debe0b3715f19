//! Alert records raised by the bus.

use serde::{Deserialize, Serialize};

use crate::id::{AlertId, DeviceId, SeriesId};
use crate::time::Timestamp;

/// Lifecycle status of an alert. Resolution happens outside the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Pending,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

/// A persisted alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: AlertId,
    pub device_id: Option<DeviceId>,
    pub series_id: Option<SeriesId>,
    /// Free-form classification (e.g. `threshold_high`, `motion`).
    pub kind: String,
    pub message: String,
    pub created_at: Timestamp,
    pub status: AlertStatus,
}

impl AlertRecord {
    /// Create a new pending alert.
    #[must_use]
    pub fn pending(
        device_id: Option<DeviceId>,
        series_id: Option<SeriesId>,
        kind: impl Into<String>,
        message: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: AlertId::new(),
            device_id,
            series_id,
            kind: kind.into(),
            message: message.into(),
            created_at,
            status: AlertStatus::Pending,
        }
    }
}

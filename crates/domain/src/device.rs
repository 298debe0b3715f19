//! Device: a physical or simulated thing the bus can actuate.

use serde::{Deserialize, Serialize};

use crate::error::{HomeBusError, ValidationError};
use crate::id::DeviceId;

/// Operational status of a device as recorded by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    #[default]
    Inactive,
}

impl DeviceStatus {
    /// Whether the device is switched on.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Parse the store representation (`active` / `inactive`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

/// A device record owned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Device class used to select actuators (e.g. `fan`, `light`).
    pub class: String,
    pub status: DeviceStatus,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeBusError::Validation`] when `name` or `class` is empty.
    pub fn validate(&self) -> Result<(), HomeBusError> {
        if self.name.is_empty() || self.class.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    class: Option<String>,
    status: DeviceStatus,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`HomeBusError::Validation`] if the id is missing or the
    /// name or class is empty.
    pub fn build(self) -> Result<Device, HomeBusError> {
        let device = Device {
            id: self.id.ok_or(ValidationError::EmptyIdentifier)?,
            name: self.name.unwrap_or_default(),
            class: self.class.unwrap_or_default(),
            status: self.status,
        };
        device.validate()?;
        Ok(device)
    }
}

//! Typed identifiers.
//!
//! Records created by the bus itself (readings, alerts, events) use random
//! UUIDs. Series and devices are addressed by the keys that appear in broker
//! topics, so they are validated strings that can always be embedded in a
//! topic segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

macro_rules! define_key {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a key.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError`] if the key is empty or contains
            /// `/`, `+` or `#`.
            pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
                let key = key.into();
                validate_key(&key)?;
                Ok(Self(key))
            }

            /// Borrow the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    if key.contains(['/', '+', '#']) {
        return Err(ValidationError::ReservedCharacter(key.to_string()));
    }
    Ok(())
}

define_key!(
    /// Identifier of a named stream of numeric readings (e.g. `temperature`).
    SeriesId
);

define_key!(
    /// Identifier of a physical or simulated device.
    DeviceId
);

define_id!(
    /// Unique identifier for a persisted [`Reading`](crate::reading::Reading).
    ReadingId
);

define_id!(
    /// Unique identifier for an [`AlertRecord`](crate::alert::AlertRecord).
    AlertId
);

define_id!(
    /// Unique identifier for an [`Event`](crate::event::Event).
    EventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = ReadingId::new();
        let b = ReadingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_uuid_id_through_display_and_from_str() {
        let id = AlertId::new();
        let parsed: AlertId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_accept_plain_key() {
        let id = DeviceId::new("7").unwrap();
        assert_eq!(id.as_str(), "7");
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn should_reject_empty_key() {
        assert_eq!(SeriesId::new(""), Err(ValidationError::EmptyIdentifier));
    }

    #[test]
    fn should_reject_key_with_reserved_characters() {
        for key in ["a/b", "+", "temp#"] {
            assert!(matches!(
                DeviceId::new(key),
                Err(ValidationError::ReservedCharacter(_))
            ));
        }
    }

    #[test]
    fn should_serialize_key_as_plain_string() {
        let id = SeriesId::new("temperature").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"temperature\"");
    }

    #[test]
    fn should_reject_invalid_key_when_deserializing() {
        let result: Result<DeviceId, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }
}

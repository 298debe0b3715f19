//! Inbound payload decoding.
//!
//! Devices publish either bare scalars (`25.3`, `"ON"`, or non-JSON text)
//! or JSON objects:
//!
//! ```json
//! {"value": 25.3, "timestamp": "2024-05-01T12:00:00Z", "source": "device"}
//! ```
//!
//! Multi-sensor boards also publish a `sensors` object with one member per
//! series. Their `alerts` array is not read: boards publish each of those
//! alerts again on the alerts topic. Decoding never fails on unknown or
//! mistyped fields; accessors report what is missing through [`DecodeError`].

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::device::DeviceStatus;
use crate::error::DecodeError;
use crate::time::{self, Timestamp};

/// A scalar as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl WireValue {
    /// Numeric interpretation; text is parsed, booleans map to `1.0` / `0.0`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Bool(flag) => f64::from(u8::from(*flag)),
            Self::Number(number) => *number,
            Self::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Textual interpretation, used for identifiers and messages.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(flag) => flag.to_string(),
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text.trim().to_string(),
        }
    }

    /// On/off interpretation of a control value.
    #[must_use]
    pub fn as_status(&self) -> Option<DeviceStatus> {
        match self {
            Self::Bool(true) => Some(DeviceStatus::Active),
            Self::Bool(false) => Some(DeviceStatus::Inactive),
            Self::Number(number) if (*number - 1.0).abs() < f64::EPSILON => {
                Some(DeviceStatus::Active)
            }
            Self::Number(number) if number.abs() < f64::EPSILON => Some(DeviceStatus::Inactive),
            Self::Number(_) => None,
            Self::Text(text) => status_from_token(text),
        }
    }
}

fn status_from_token(token: &str) -> Option<DeviceStatus> {
    match token.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "active" => Some(DeviceStatus::Active),
        "off" | "0" | "false" | "inactive" => Some(DeviceStatus::Inactive),
        _ => None,
    }
}

/// A timestamp as it appears on the wire: RFC 3339 text or epoch seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Epoch(f64),
    Text(String),
}

impl WireTimestamp {
    fn resolve(&self) -> Option<Timestamp> {
        match self {
            Self::Epoch(secs) => time::from_epoch_secs(*secs),
            Self::Text(text) => time::parse_rfc3339(text),
        }
    }
}

/// Recognized fields of a JSON object payload.
///
/// Every field decodes on its own: a field of an unexpected type reads as
/// absent instead of rejecting the whole object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireObject {
    #[serde(deserialize_with = "lenient")]
    value: Option<WireValue>,
    #[serde(deserialize_with = "lenient")]
    timestamp: Option<WireTimestamp>,
    #[serde(deserialize_with = "lenient")]
    created_at: Option<WireTimestamp>,
    #[serde(deserialize_with = "lenient")]
    action: Option<String>,
    /// Only a string status is meaningful; boards send an object of relay
    /// states here, which is ignored.
    #[serde(deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    source: Option<String>,
    #[serde(deserialize_with = "lenient")]
    device_id: Option<WireValue>,
    #[serde(deserialize_with = "lenient")]
    sensor_id: Option<WireValue>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(deserialize_with = "lenient")]
    message: Option<String>,
    #[serde(deserialize_with = "lenient_members")]
    sensors: BTreeMap<String, WireValue>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Members that are `null` or not scalars are skipped one by one.
fn lenient_members<'de, D>(deserializer: D) -> Result<BTreeMap<String, WireValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Object(members) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(members
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<WireValue>(value)
                .ok()
                .map(|value| (key, value))
        })
        .collect())
}

/// A decoded inbound payload.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A bare scalar or unstructured text.
    Scalar(WireValue),
    /// A JSON object.
    Object(Box<WireObject>),
}

/// Readings carried by a sensor-channel payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorPayload {
    /// Value for the series named by the topic.
    pub value: Option<f64>,
    /// Sample time declared by the sender.
    pub timestamp: Option<Timestamp>,
    /// Fan-out readings keyed by series, from a `sensors` object.
    pub members: Vec<(String, f64)>,
}

impl SensorPayload {
    /// Whether the payload carries nothing the bus can act on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.members.is_empty()
    }
}

/// An alert declared by a broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPayload {
    pub device_id: Option<String>,
    pub series_id: Option<String>,
    pub kind: Option<String>,
    pub message: String,
}

impl Payload {
    /// Decode raw payload bytes.
    ///
    /// Anything that is not a JSON object or scalar is kept as text.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotUtf8`] if the payload is not valid UTF-8.
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(raw).map_err(|_| DecodeError::NotUtf8)?;
        let text = text.trim();
        let fallback = || Self::Scalar(WireValue::Text(text.to_string()));

        let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
            return Ok(fallback());
        };
        let payload = match value {
            serde_json::Value::Object(_) => serde_json::from_value::<WireObject>(value)
                .map(|object| Self::Object(Box::new(object)))
                .unwrap_or_else(|_| fallback()),
            serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_) => serde_json::from_value::<WireValue>(value)
                .map(Self::Scalar)
                .unwrap_or_else(|_| fallback()),
            serde_json::Value::Array(_) | serde_json::Value::Null => fallback(),
        };
        Ok(payload)
    }

    /// The origin tag declared by the sender, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Object(object) => object.source.as_deref(),
            Self::Scalar(_) => None,
        }
    }

    /// Interpret the payload as sensor data.
    #[must_use]
    pub fn sensor(&self) -> SensorPayload {
        match self {
            Self::Scalar(value) => SensorPayload {
                value: value.as_f64(),
                ..SensorPayload::default()
            },
            Self::Object(object) => SensorPayload {
                value: object.value.as_ref().and_then(WireValue::as_f64),
                timestamp: object
                    .timestamp
                    .as_ref()
                    .or(object.created_at.as_ref())
                    .and_then(WireTimestamp::resolve),
                members: object
                    .sensors
                    .iter()
                    .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
                    .collect(),
            },
        }
    }

    /// Interpret the payload as a device status report.
    ///
    /// Checks `action`, then `value`, then `status`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingStatus`] if no field maps to on/off.
    pub fn device_status(&self) -> Result<DeviceStatus, DecodeError> {
        let status = match self {
            Self::Scalar(value) => value.as_status(),
            Self::Object(object) => object
                .action
                .as_deref()
                .and_then(status_from_token)
                .or_else(|| object.value.as_ref().and_then(WireValue::as_status))
                .or_else(|| object.status.as_deref().and_then(status_from_token)),
        };
        status.ok_or(DecodeError::MissingStatus)
    }

    /// Interpret the payload as an alert declaration.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingMessage`] if there is no message text.
    pub fn alert(&self) -> Result<AlertPayload, DecodeError> {
        let alert = match self {
            Self::Scalar(value) => AlertPayload {
                device_id: None,
                series_id: None,
                kind: None,
                message: value.as_text(),
            },
            Self::Object(object) => AlertPayload {
                device_id: object.device_id.as_ref().map(WireValue::as_text),
                series_id: object.sensor_id.as_ref().map(WireValue::as_text),
                kind: object.kind.clone(),
                message: object
                    .message
                    .clone()
                    .or_else(|| object.value.as_ref().map(WireValue::as_text))
                    .unwrap_or_default(),
            },
        };
        if alert.message.trim().is_empty() {
            return Err(DecodeError::MissingMessage);
        }
        Ok(alert)
    }
}

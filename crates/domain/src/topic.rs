//! Topic codec: structured addresses for hierarchical broker topics.
//!
//! Recognized shapes, all rooted at a configured namespace:
//!
//! | Topic | Address |
//! |-------|---------|
//! | `<ns>/sensors/<series>` | [`Address::Sensor`] |
//! | `<ns>/devices/<device>/control` | [`Address::DeviceControl`] |
//! | `<ns>/alerts` | [`Address::Alerts`] |
//!
//! Anything else decodes to [`Address::Unrecognized`]; callers drop those
//! messages rather than failing.

use crate::id::{DeviceId, SeriesId};

const SEPARATOR: char = '/';
const SENSORS: &str = "sensors";
const DEVICES: &str = "devices";
const CONTROL: &str = "control";
const ALERTS: &str = "alerts";

/// A decoded topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Readings for one series.
    Sensor(SeriesId),
    /// Control messages for one device.
    DeviceControl(DeviceId),
    /// The explicit alert channel.
    Alerts,
    /// Any topic not matching a recognized shape.
    Unrecognized,
}

/// Channel kinds a device topic can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChannel {
    Control,
}

/// Encodes and decodes topics under a fixed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCodec {
    namespace: String,
}

impl Default for TopicCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAMESPACE)
    }
}

impl TopicCodec {
    /// Namespace used when none is configured.
    pub const DEFAULT_NAMESPACE: &'static str = "home";

    /// Create a codec rooted at `namespace` (e.g. `"home"`).
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The namespace every topic starts with.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decode a topic string into an [`Address`].
    #[must_use]
    pub fn decode(&self, topic: &str) -> Address {
        let segments: Vec<&str> = topic.split(SEPARATOR).collect();
        match segments.as_slice() {
            [ns, SENSORS, series] if *ns == self.namespace => SeriesId::new(*series)
                .map(Address::Sensor)
                .unwrap_or(Address::Unrecognized),
            [ns, DEVICES, device, CONTROL] if *ns == self.namespace => DeviceId::new(*device)
                .map(Address::DeviceControl)
                .unwrap_or(Address::Unrecognized),
            [ns, ALERTS] if *ns == self.namespace => Address::Alerts,
            _ => Address::Unrecognized,
        }
    }

    /// Build the topic for a device channel.
    #[must_use]
    pub fn encode(&self, device_id: &DeviceId, channel: DeviceChannel) -> String {
        match channel {
            DeviceChannel::Control => {
                format!("{}/{DEVICES}/{device_id}/{CONTROL}", self.namespace)
            }
        }
    }

    /// Build the topic a series publishes readings on.
    #[must_use]
    pub fn encode_sensor(&self, series_id: &SeriesId) -> String {
        format!("{}/{SENSORS}/{series_id}", self.namespace)
    }

    /// Build the alert channel topic.
    #[must_use]
    pub fn alerts_topic(&self) -> String {
        format!("{}/{ALERTS}", self.namespace)
    }

    /// Topic filters the bus subscribes to on every (re)connect.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}/{SENSORS}/+", self.namespace),
            format!("{}/{DEVICES}/+/{CONTROL}", self.namespace),
            self.alerts_topic(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> TopicCodec {
        TopicCodec::new("home")
    }

    #[test]
    fn should_decode_sensor_topic() {
        let address = codec().decode("home/sensors/temperature");
        assert_eq!(
            address,
            Address::Sensor(SeriesId::new("temperature").unwrap())
        );
    }

    #[test]
    fn should_decode_device_control_topic() {
        let address = codec().decode("home/devices/7/control");
        assert_eq!(address, Address::DeviceControl(DeviceId::new("7").unwrap()));
    }

    #[test]
    fn should_decode_alert_channel() {
        assert_eq!(codec().decode("home/alerts"), Address::Alerts);
    }

    #[test]
    fn should_not_recognize_unknown_shape() {
        assert_eq!(codec().decode("home/unknown/42"), Address::Unrecognized);
    }

    #[test]
    fn should_not_recognize_foreign_namespace() {
        assert_eq!(
            codec().decode("office/sensors/temperature"),
            Address::Unrecognized
        );
    }

    #[test]
    fn should_not_recognize_device_topic_without_control_marker() {
        assert_eq!(codec().decode("home/devices/7"), Address::Unrecognized);
        assert_eq!(codec().decode("home/devices/7/status"), Address::Unrecognized);
    }

    #[test]
    fn should_not_recognize_empty_identifier() {
        assert_eq!(codec().decode("home/sensors/"), Address::Unrecognized);
        assert_eq!(codec().decode("home/devices//control"), Address::Unrecognized);
    }

    #[test]
    fn should_not_recognize_extra_segments() {
        assert_eq!(
            codec().decode("home/sensors/temperature/raw"),
            Address::Unrecognized
        );
    }

    #[test]
    fn should_encode_control_topic() {
        let topic = codec().encode(&DeviceId::new("fan").unwrap(), DeviceChannel::Control);
        assert_eq!(topic, "home/devices/fan/control");
    }

    #[test]
    fn should_list_subscription_filters() {
        assert_eq!(
            codec().subscriptions(),
            vec![
                "home/sensors/+".to_string(),
                "home/devices/+/control".to_string(),
                "home/alerts".to_string(),
            ]
        );
    }

    #[test]
    fn should_decode_encoded_sensor_topic() {
        let series = SeriesId::new("humidity").unwrap();
        let topic = codec().encode_sensor(&series);
        assert_eq!(codec().decode(&topic), Address::Sensor(series));
    }

    proptest! {
        #[test]
        fn decode_is_left_inverse_of_encode_for_control_topics(
            namespace in "[a-z][a-z0-9_-]{0,11}",
            key in "[^/+#]{1,24}",
        ) {
            let codec = TopicCodec::new(namespace);
            let device = DeviceId::new(key).unwrap();
            let topic = codec.encode(&device, DeviceChannel::Control);
            prop_assert_eq!(codec.decode(&topic), Address::DeviceControl(device));
        }
    }
}

//! MQTT broker configuration.

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Namespace every topic starts with.
    pub base_topic: String,
    /// Optional broker credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Fixed delay before reconnecting after a failure, in seconds.
    pub reconnect_interval_secs: u64,
    /// Capacity of the client request queue and the inbound channel.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "homebus".to_string(),
            base_topic: "home".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_interval_secs: 5,
            channel_capacity: 64,
        }
    }
}

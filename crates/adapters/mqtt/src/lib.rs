//! # homebus-adapter-mqtt
//!
//! MQTT adapter: connects homebus to the message broker.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and reconnect after failures
//! - Subscribe to the sensor, device-control and alert topics on every connect
//! - Forward inbound publishes to the telemetry router over a bounded channel
//! - Implement the `CommandPublisher` port for outbound commands
//!
//! ## Dependency rule
//! Same as other adapters: depends on `homebus-app` and `homebus-domain`.

pub mod config;
pub mod connection;
pub mod error;

pub use config::MqttConfig;
pub use connection::{BrokerConnection, BrokerEventLoop, ConnectionState, connect};
pub use error::MqttError;

//! MQTT adapter error types.

use homebus_domain::error::{HomeBusError, PublishError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker connection is not established.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`PublishError`] for propagation across port boundaries.
    #[must_use]
    pub fn into_publish(self) -> PublishError {
        match self {
            Self::NotConnected => PublishError::NotConnected,
            Self::Client(err) => PublishError::Transport(Box::new(err)),
        }
    }
}

impl From<MqttError> for PublishError {
    fn from(err: MqttError) -> Self {
        err.into_publish()
    }
}

impl From<MqttError> for HomeBusError {
    fn from(err: MqttError) -> Self {
        Self::Publish(err.into_publish())
    }
}

//! Broker port: outbound publishing.

use std::future::Future;

use homebus_domain::error::PublishError;

/// Hands messages to the broker.
///
/// Delivery is at-most-once: a message that cannot be handed over right now
/// is reported as an error, never queued.
pub trait CommandPublisher {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send {
        (**self).publish(topic, payload)
    }
}

//! Command service: the single path by which the bus actuates devices.
//!
//! Both the predictive control loop and requests from the HTTP layer go
//! through here, so every outbound command is addressed through the same
//! identifier mapping and tagged by the same [`FeedbackGuard`].

use homebus_domain::command::{Action, Command, Origin};
use homebus_domain::device::Device;
use homebus_domain::error::{HomeBusError, NotFoundError, PublishError};
use homebus_domain::event::{Event, EventType};
use homebus_domain::feedback::FeedbackGuard;
use homebus_domain::id::DeviceId;
use homebus_domain::mapping::IdentifierMap;
use homebus_domain::time::now;
use homebus_domain::topic::{DeviceChannel, TopicCodec};

use crate::ports::{CommandPublisher, DeviceRepository, EventPublisher};

/// Addressing shared by everything that publishes commands.
#[derive(Debug, Clone, Default)]
pub struct CommandRouting {
    pub codec: TopicCodec,
    pub mapping: IdentifierMap,
    pub guard: FeedbackGuard,
}

/// Application service publishing tagged commands.
pub struct CommandService<D, P, E> {
    devices: D,
    broker: P,
    publisher: E,
    routing: CommandRouting,
}

impl<D, P, E> CommandService<D, P, E>
where
    D: DeviceRepository,
    P: CommandPublisher,
    E: EventPublisher,
{
    pub fn new(devices: D, broker: P, publisher: E, routing: CommandRouting) -> Self {
        Self {
            devices,
            broker,
            publisher,
            routing,
        }
    }

    /// Hand a tagged command to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the payload cannot be encoded or the
    /// broker refuses it (e.g. while disconnected).
    pub async fn dispatch(&self, command: &Command) -> Result<(), PublishError> {
        let topic_key = self
            .routing
            .mapping
            .device_topic_key(&command.target_device_id);
        let topic = self.routing.codec.encode(&topic_key, DeviceChannel::Control);

        let mut payload = self.routing.guard.tag(command);
        payload.device_id = topic_key;
        let body = serde_json::to_vec(&payload).map_err(PublishError::Encode)?;

        self.broker.publish(topic.clone(), body).await?;
        tracing::info!(
            %topic,
            action = %command.action,
            origin = %command.origin,
            "command published"
        );

        let event = Event::new(
            EventType::CommandIssued,
            Some(command.target_device_id.to_string()),
            serde_json::json!({
                "action": command.action,
                "status": command.resulting_status,
                "origin": command.origin,
                "topic": topic,
            }),
        );
        let _ = self.publisher.publish(event).await;
        Ok(())
    }

    /// Publish `action` for `device_id` without touching the store.
    ///
    /// Returns whether the broker accepted the command.
    #[tracing::instrument(skip(self))]
    pub async fn publish_command(&self, device_id: &DeviceId, action: Action, origin: Origin) -> bool {
        let command = Command::new(device_id.clone(), action, origin, now());
        match self.dispatch(&command).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "command not published");
                false
            }
        }
    }

    /// Record the resulting status of `command` in the store, then publish it.
    ///
    /// Returns `None` without publishing if the device is unknown. A failed
    /// publish is logged; the store update stands.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn execute(&self, command: &Command) -> Result<Option<Device>, HomeBusError> {
        let Some(device) = self
            .devices
            .update_status(&command.target_device_id, command.resulting_status)
            .await?
        else {
            tracing::warn!(device_id = %command.target_device_id, "command target not found");
            return Ok(None);
        };

        if let Err(err) = self.dispatch(command).await {
            tracing::warn!(device_id = %device.id, error = %err, "command not published");
        }
        Ok(Some(device))
    }

    /// Switch a device on request of the HTTP layer.
    ///
    /// # Errors
    ///
    /// Returns [`HomeBusError::NotFound`] when no device with `device_id`
    /// exists, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn control_device(
        &self,
        device_id: &DeviceId,
        action: Action,
    ) -> Result<Device, HomeBusError> {
        let command = Command::new(device_id.clone(), action, Origin::ExternalApi, now());
        self.execute(&command).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }
}

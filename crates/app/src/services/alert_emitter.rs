//! Alert emitter: persists alerts and announces them.

use homebus_domain::alert::AlertRecord;
use homebus_domain::error::HomeBusError;
use homebus_domain::event::{Event, EventType};
use homebus_domain::id::{DeviceId, SeriesId};
use homebus_domain::time::Timestamp;

use crate::ports::{AlertRepository, EventPublisher};

/// Turns alert conditions into persisted, pending [`AlertRecord`]s.
///
/// Thresholds are evaluated by the caller; the emitter only records.
pub struct AlertEmitter<A, E> {
    repo: A,
    publisher: E,
}

impl<A, E> AlertEmitter<A, E>
where
    A: AlertRepository,
    E: EventPublisher,
{
    pub fn new(repo: A, publisher: E) -> Self {
        Self { repo, publisher }
    }

    /// Persist a pending alert and broadcast an `alert_raised` event.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, message), fields(kind = %kind))]
    pub async fn emit(
        &self,
        device_id: Option<DeviceId>,
        series_id: Option<SeriesId>,
        kind: &str,
        message: &str,
        created_at: Timestamp,
    ) -> Result<AlertRecord, HomeBusError> {
        let record = AlertRecord::pending(device_id, series_id, kind, message, created_at);
        let record = self.repo.create_alert(record).await?;
        tracing::info!(alert_id = %record.id, message = %record.message, "alert raised");

        let event = Event::new(
            EventType::AlertRaised,
            record
                .series_id
                .as_ref()
                .map(ToString::to_string)
                .or_else(|| record.device_id.as_ref().map(ToString::to_string)),
            serde_json::json!({
                "alert_id": record.id.to_string(),
                "kind": record.kind,
                "message": record.message,
            }),
        );
        let _ = self.publisher.publish(event).await;

        Ok(record)
    }
}

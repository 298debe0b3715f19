//! Telemetry router: decodes every inbound broker message and dispatches it.
//!
//! Messages are handled one at a time, in arrival order:
//!
//! - **sensor** topics persist readings, check alert thresholds and feed the
//!   trend predictor, which may switch actuators on;
//! - **device control** topics record device status, unless the message is
//!   an echo of a command the bus published itself;
//! - the **alerts** topic records alerts. Boards also copy their alerts
//!   into the sensor payload; that copy is not recorded.
//!
//! Malformed messages are logged and dropped. Storage failures are returned
//! to the caller.

use tokio::sync::mpsc;

use homebus_domain::alert::AlertRecord;
use homebus_domain::device::Device;
use homebus_domain::error::{DecodeError, HomeBusError};
use homebus_domain::event::{Event, EventType};
use homebus_domain::id::{DeviceId, SeriesId};
use homebus_domain::inbound::InboundMessage;
use homebus_domain::payload::{AlertPayload, Payload};
use homebus_domain::policy::AutoControlPolicy;
use homebus_domain::prediction::PredictorConfig;
use homebus_domain::reading::Reading;
use homebus_domain::threshold::AlertThreshold;
use homebus_domain::time::{Timestamp, now};
use homebus_domain::topic::Address;

use crate::ports::{
    AlertRepository, CommandPublisher, DeviceRepository, EventPublisher, ReadingRepository,
};
use crate::predictor::TrendPredictor;
use crate::services::alert_emitter::AlertEmitter;
use crate::services::command_service::{CommandRouting, CommandService};

/// Alert kind used when a message does not declare one.
const DEFAULT_ALERT_KIND: &str = "alert";

/// A series whose trend drives auto-control.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedSeries {
    pub series: SeriesId,
    /// Value the prediction is compared against.
    pub threshold: f64,
    /// Class of devices switched on when the prediction fires.
    pub actuator_class: String,
}

/// Everything the router needs besides its ports.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub routing: CommandRouting,
    pub predictor: PredictorConfig,
    pub predicted: Vec<PredictedSeries>,
    pub confidence_gate: f64,
    pub thresholds: Vec<AlertThreshold>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            routing: CommandRouting::default(),
            predictor: PredictorConfig::default(),
            predicted: SeriesId::new("temperature")
                .map(|series| PredictedSeries {
                    series,
                    threshold: 30.0,
                    actuator_class: "fan".to_string(),
                })
                .into_iter()
                .collect(),
            confidence_gate: 0.7,
            thresholds: Vec::new(),
        }
    }
}

/// What the router did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The message was not acted on.
    Dropped(DecodeError),
    /// Sensor data was persisted.
    Recorded {
        readings: usize,
        commands: usize,
        alerts: usize,
    },
    /// A device status was updated.
    DeviceUpdated(Device),
    /// A status report named a device the store does not know.
    DeviceUnknown(DeviceId),
    /// The message echoed one of the bus's own commands.
    Suppressed,
    /// An alert was recorded.
    AlertRaised(AlertRecord),
}

pub struct TelemetryRouter<R, D, A, P, E> {
    readings: R,
    devices: D,
    alerts: AlertEmitter<A, E>,
    commands: CommandService<D, P, E>,
    publisher: E,
    predictor: TrendPredictor,
    settings: RouterSettings,
}

impl<R, D, A, P, E> TelemetryRouter<R, D, A, P, E>
where
    R: ReadingRepository,
    D: DeviceRepository + Clone,
    A: AlertRepository,
    P: CommandPublisher,
    E: EventPublisher + Clone,
{
    pub fn new(
        readings: R,
        devices: D,
        alerts: A,
        broker: P,
        publisher: E,
        settings: RouterSettings,
    ) -> Self {
        Self {
            readings,
            alerts: AlertEmitter::new(alerts, publisher.clone()),
            commands: CommandService::new(
                devices.clone(),
                broker,
                publisher.clone(),
                settings.routing.clone(),
            ),
            devices,
            publisher,
            predictor: TrendPredictor::new(settings.predictor),
            settings,
        }
    }

    /// The command path shared with the HTTP layer.
    pub fn commands(&self) -> &CommandService<D, P, E> {
        &self.commands
    }

    /// Handle messages until the inbound channel closes.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            let topic = message.topic.clone();
            match self.dispatch(message).await {
                Ok(outcome) => tracing::trace!(%topic, ?outcome, "message handled"),
                Err(err) => tracing::error!(%topic, error = %err, "failed to handle message"),
            }
        }
        tracing::info!("inbound stream closed");
    }

    /// Decode and act on one inbound message.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a repository call fails. Undecodable
    /// messages are not errors; they yield [`Dispatch::Dropped`].
    #[tracing::instrument(skip(self, message), fields(topic = %message.topic))]
    pub async fn dispatch(&self, message: InboundMessage) -> Result<Dispatch, HomeBusError> {
        let address = self.settings.routing.codec.decode(&message.topic);
        if address == Address::Unrecognized {
            tracing::debug!("dropping message on unrecognized topic");
            return Ok(Dispatch::Dropped(DecodeError::UnrecognizedTopic(
                message.topic,
            )));
        }

        let payload = match Payload::parse(&message.payload) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed payload");
                return Ok(Dispatch::Dropped(err));
            }
        };

        match address {
            Address::Sensor(series) => {
                self.handle_sensor(&series, &payload, message.received_at)
                    .await
            }
            Address::DeviceControl(device) => self.handle_control(&device, &payload).await,
            Address::Alerts => self.handle_alert(&payload, message.received_at).await,
            Address::Unrecognized => Ok(Dispatch::Dropped(DecodeError::UnrecognizedTopic(
                message.topic,
            ))),
        }
    }

    async fn handle_sensor(
        &self,
        topic_series: &SeriesId,
        payload: &Payload,
        received_at: Timestamp,
    ) -> Result<Dispatch, HomeBusError> {
        let sensor = payload.sensor();
        if sensor.is_empty() {
            tracing::warn!(series = %topic_series, "dropping sensor payload without value");
            return Ok(Dispatch::Dropped(DecodeError::MissingValue));
        }
        let recorded_at = sensor.timestamp.unwrap_or(received_at);
        let mapping = &self.settings.routing.mapping;

        let mut samples = Vec::with_capacity(sensor.members.len() + 1);
        if let Some(value) = sensor.value {
            let series = mapping
                .series(topic_series.as_str())
                .unwrap_or_else(|| topic_series.clone());
            samples.push((series, value));
        }
        for (key, value) in &sensor.members {
            match mapping.series(key) {
                Some(series) => samples.push((series, *value)),
                None => tracing::debug!(member = %key, "skipping member with invalid series key"),
            }
        }

        if samples.is_empty() {
            tracing::warn!(series = %topic_series, "dropping sensor payload without usable series");
            return Ok(Dispatch::Dropped(DecodeError::MissingValue));
        }

        let (mut commands, mut alerts) = (0, 0);
        for (series, value) in &samples {
            let reading = self
                .readings
                .insert_reading(series, *value, recorded_at)
                .await?;
            tracing::debug!(series = %series, value, "reading recorded");
            let event = Event::new(
                EventType::ReadingRecorded,
                Some(series.to_string()),
                serde_json::json!({
                    "reading_id": reading.id.to_string(),
                    "value": reading.value,
                    "recorded_at": reading.recorded_at,
                }),
            );
            let _ = self.publisher.publish(event).await;

            alerts += self.check_thresholds(&reading).await?;
            commands += self.predict_and_act(&reading).await?;
        }

        Ok(Dispatch::Recorded {
            readings: samples.len(),
            commands,
            alerts,
        })
    }

    async fn check_thresholds(&self, reading: &Reading) -> Result<usize, HomeBusError> {
        let mut raised = 0;
        for threshold in self
            .settings
            .thresholds
            .iter()
            .filter(|threshold| threshold.series == reading.series_id)
        {
            let Some(breach) = threshold.evaluate(reading.value) else {
                continue;
            };
            self.alerts
                .emit(
                    None,
                    Some(reading.series_id.clone()),
                    breach.kind.tag(),
                    &threshold.describe(&breach),
                    reading.recorded_at,
                )
                .await?;
            raised += 1;
        }
        Ok(raised)
    }

    async fn predict_and_act(&self, reading: &Reading) -> Result<usize, HomeBusError> {
        let Some(target) = self
            .settings
            .predicted
            .iter()
            .find(|predicted| predicted.series == reading.series_id)
        else {
            return Ok(0);
        };
        let series = &reading.series_id;

        if !self.predictor.contains(series) {
            let history: Vec<Reading> = self
                .readings
                .recent_readings(series, self.predictor.config().capacity + 1)
                .await?
                .into_iter()
                .filter(|past| past.id != reading.id)
                .collect();
            self.predictor.hydrate(series, &history);
        }

        let prediction =
            self.predictor
                .observe(series, target.threshold, reading.value, reading.recorded_at);
        tracing::debug!(
            series = %series,
            predicted = prediction.predicted_value,
            confidence = prediction.confidence,
            exceed = prediction.will_exceed_threshold,
            "prediction computed"
        );
        let event = Event::new(
            EventType::PredictionComputed,
            Some(series.to_string()),
            serde_json::to_value(&prediction).unwrap_or_default(),
        );
        let _ = self.publisher.publish(event).await;

        let policy = AutoControlPolicy::new(self.settings.confidence_gate, &target.actuator_class);
        if !policy.fires(&prediction) {
            return Ok(0);
        }

        let candidates = self.devices.actuators_by_class(&policy.actuator_class).await?;
        let commands = policy.decide(&prediction, &candidates, now());
        if commands.is_empty() {
            tracing::debug!(series = %series, "prediction fired; all actuators already active");
        }
        for command in &commands {
            tracing::info!(
                series = %series,
                device_id = %command.target_device_id,
                "auto-control switching actuator on"
            );
            self.commands.execute(command).await?;
        }
        Ok(commands.len())
    }

    async fn handle_control(
        &self,
        topic_device: &DeviceId,
        payload: &Payload,
    ) -> Result<Dispatch, HomeBusError> {
        if self.settings.routing.guard.is_echo(payload.source()) {
            tracing::debug!(device = %topic_device, source = ?payload.source(), "suppressing echo");
            let event = Event::new(
                EventType::EchoSuppressed,
                Some(topic_device.to_string()),
                serde_json::json!({ "source": payload.source() }),
            );
            let _ = self.publisher.publish(event).await;
            return Ok(Dispatch::Suppressed);
        }

        let status = match payload.device_status() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(device = %topic_device, error = %err, "dropping control payload");
                return Ok(Dispatch::Dropped(err));
            }
        };

        let device_id = self
            .settings
            .routing
            .mapping
            .device(topic_device.as_str())
            .unwrap_or_else(|| topic_device.clone());
        let Some(device) = self.devices.update_status(&device_id, status).await? else {
            tracing::warn!(device_id = %device_id, "status report for unknown device");
            return Ok(Dispatch::DeviceUnknown(device_id));
        };

        tracing::info!(device_id = %device.id, status = %device.status, "device status updated");
        let event = Event::new(
            EventType::DeviceStatusChanged,
            Some(device.id.to_string()),
            serde_json::json!({ "status": device.status }),
        );
        let _ = self.publisher.publish(event).await;
        Ok(Dispatch::DeviceUpdated(device))
    }

    async fn handle_alert(
        &self,
        payload: &Payload,
        received_at: Timestamp,
    ) -> Result<Dispatch, HomeBusError> {
        match payload.alert() {
            Ok(alert) => Ok(Dispatch::AlertRaised(self.raise(alert, received_at).await?)),
            Err(err) => {
                tracing::warn!(error = %err, "dropping alert payload");
                Ok(Dispatch::Dropped(err))
            }
        }
    }

    async fn raise(
        &self,
        alert: AlertPayload,
        created_at: Timestamp,
    ) -> Result<AlertRecord, HomeBusError> {
        let mapping = &self.settings.routing.mapping;
        let device_id = alert.device_id.as_deref().and_then(|key| mapping.device(key));
        let series_id = alert.series_id.as_deref().and_then(|key| mapping.series(key));
        let kind = alert.kind.as_deref().unwrap_or(DEFAULT_ALERT_KIND);
        self.alerts
            .emit(device_id, series_id, kind, &alert.message, created_at)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::testing::{
        InMemoryAlertRepo, InMemoryDeviceRepo, InMemoryReadingRepo, RecordingBroker,
        SpyPublisher,
    };
    use homebus_domain::device::DeviceStatus;

    type TestRouter = TelemetryRouter<
        Arc<InMemoryReadingRepo>,
        Arc<InMemoryDeviceRepo>,
        Arc<InMemoryAlertRepo>,
        Arc<RecordingBroker>,
        Arc<SpyPublisher>,
    >;

    struct Fixture {
        readings: Arc<InMemoryReadingRepo>,
        devices: Arc<InMemoryDeviceRepo>,
        alerts: Arc<InMemoryAlertRepo>,
        broker: Arc<RecordingBroker>,
        events: Arc<SpyPublisher>,
        router: TestRouter,
    }

    fn fan(id: &str, status: DeviceStatus) -> Device {
        Device::builder()
            .id(DeviceId::new(id).unwrap())
            .name(format!("Fan {id}"))
            .class("fan")
            .status(status)
            .build()
            .unwrap()
    }

    fn fixture_with(settings: RouterSettings, devices: Vec<Device>) -> Fixture {
        let readings = Arc::new(InMemoryReadingRepo::default());
        let devices = Arc::new(InMemoryDeviceRepo::with(devices));
        let alerts = Arc::new(InMemoryAlertRepo::default());
        let broker = Arc::new(RecordingBroker::default());
        let events = Arc::new(SpyPublisher::default());
        let router = TelemetryRouter::new(
            Arc::clone(&readings),
            Arc::clone(&devices),
            Arc::clone(&alerts),
            Arc::clone(&broker),
            Arc::clone(&events),
            settings,
        );
        Fixture {
            readings,
            devices,
            alerts,
            broker,
            events,
            router,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            RouterSettings::default(),
            vec![
                fan("1", DeviceStatus::Inactive),
                fan("2", DeviceStatus::Active),
                fan("7", DeviceStatus::Inactive),
            ],
        )
    }

    fn message(topic: &str, payload: &str) -> InboundMessage {
        InboundMessage::new(topic, payload, now())
    }

    #[tokio::test]
    async fn should_drop_unrecognized_topic_without_store_calls() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message("home/unknown/42", "25"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Dispatch::Dropped(DecodeError::UnrecognizedTopic(
                "home/unknown/42".to_string()
            ))
        );
        assert!(f.readings.all().is_empty());
        assert_eq!(f.devices.update_calls(), 0);
        assert!(f.alerts.all().is_empty());
    }

    #[tokio::test]
    async fn should_drop_topic_from_other_namespace() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(message("office/sensors/temperature", "25"))
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::Dropped(_)));
        assert!(f.readings.all().is_empty());
    }

    #[tokio::test]
    async fn should_record_reading_from_bare_scalar() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message("home/sensors/humidity", "55.5"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Dispatch::Recorded {
                readings: 1,
                commands: 0,
                alerts: 0
            }
        );
        let stored = f.readings.all();
        assert_eq!(stored[0].series_id.as_str(), "humidity");
        assert!((stored[0].value - 55.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_use_declared_timestamp() {
        let f = fixture();
        f.router
            .dispatch(message(
                "home/sensors/humidity",
                r#"{"value": 40, "timestamp": "2024-05-01T12:00:00Z"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(
            f.readings.all()[0].recorded_at.to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn should_drop_sensor_payload_without_value() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message("home/sensors/humidity", r#"{"value": "n/a"}"#))
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Dropped(DecodeError::MissingValue));
        assert!(f.readings.all().is_empty());
    }

    #[tokio::test]
    async fn should_drop_non_utf8_payload() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(InboundMessage::new(
                "home/sensors/humidity",
                vec![0xff, 0xfe],
                now(),
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Dropped(DecodeError::NotUtf8));
    }

    #[tokio::test]
    async fn should_switch_fans_on_when_temperature_rises() {
        let f = fixture();
        let start = now();

        let mut last = None;
        for (offset, value) in (0i64..).zip([26, 27, 28, 29, 30]) {
            let msg = InboundMessage::new(
                "home/sensors/temperature",
                value.to_string(),
                start + Duration::seconds(offset),
            );
            last = Some(f.router.dispatch(msg).await.unwrap());
        }

        assert_eq!(
            last.unwrap(),
            Dispatch::Recorded {
                readings: 1,
                commands: 2,
                alerts: 0
            }
        );
        assert_eq!(f.devices.get("1").unwrap().status, DeviceStatus::Active);
        assert_eq!(f.devices.get("7").unwrap().status, DeviceStatus::Active);

        let published = f.broker.published();
        let topics: Vec<&str> = published.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            topics,
            vec!["home/devices/1/control", "home/devices/7/control"]
        );
        assert!(published.iter().all(|(_, body)| body["action"] == "ON"
            && body["status"] == "active"
            && body["source"] == "auto-control"));
    }

    #[tokio::test]
    async fn should_not_command_before_window_is_warm() {
        let f = fixture();
        for value in [40, 50, 60, 70] {
            f.router
                .dispatch(message("home/sensors/temperature", &value.to_string()))
                .await
                .unwrap();
        }
        assert!(f.broker.published().is_empty());
        assert_eq!(f.devices.update_calls(), 0);
    }

    #[tokio::test]
    async fn should_hydrate_window_from_stored_history() {
        let f = fixture();
        let start = now();
        for offset in 0..4 {
            f.readings
                .insert_reading(
                    &SeriesId::new("temperature").unwrap(),
                    26.0 + f64::from(offset),
                    start + Duration::seconds(i64::from(offset)),
                )
                .await
                .unwrap();
        }

        let outcome = f
            .router
            .dispatch(InboundMessage::new(
                "home/sensors/temperature",
                "30",
                start + Duration::seconds(4),
            ))
            .await
            .unwrap();

        assert!(matches!(outcome, Dispatch::Recorded { commands: 2, .. }));
    }

    #[tokio::test]
    async fn should_map_topic_series_to_store_series() {
        let mut settings = RouterSettings::default();
        settings.routing.mapping = toml::from_str(
            r#"
            [sensors]
            temp = "temperature"
            "#,
        )
        .unwrap();
        let f = fixture_with(settings, Vec::new());

        f.router
            .dispatch(message("home/sensors/temp", "21"))
            .await
            .unwrap();

        assert_eq!(f.readings.all()[0].series_id.as_str(), "temperature");
    }

    const BOARD_READING: &str = r#"{"device_id": "board1", "timestamp": 1700000000,
        "sensors": {"temperature": 24.5, "humidity": 22, "motion": true, "light": null},
        "status": {"fan": false, "light": true, "door": false},
        "alerts": [
            {"type": "humidity", "value": 22, "message": "Humidity below threshold: 22%"},
            {"type": "motion", "value": 1, "message": "Motion detected"}
        ]}"#;

    #[tokio::test]
    async fn should_fan_out_board_members_and_skip_unreadable_ones() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message("home/sensors/board1", BOARD_READING))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Dispatch::Recorded {
                readings: 3,
                commands: 0,
                alerts: 0
            }
        );
        let mut series: Vec<String> = f
            .readings
            .all()
            .iter()
            .map(|r| r.series_id.to_string())
            .collect();
        series.sort();
        assert_eq!(series, vec!["humidity", "motion", "temperature"]);
        assert!(
            f.readings
                .all()
                .iter()
                .all(|r| r.recorded_at.timestamp() == 1_700_000_000)
        );
    }

    #[tokio::test]
    async fn should_record_board_alert_once_when_also_sent_on_alerts_topic() {
        let f = fixture();

        f.router
            .dispatch(message("home/sensors/board1", BOARD_READING))
            .await
            .unwrap();
        f.router
            .dispatch(message(
                "home/alerts",
                r#"{"device_id": "board1", "sensor_id": "humidity", "type": "humidity",
                    "message": "Humidity below threshold: 22%", "timestamp": 1700000000.2}"#,
            ))
            .await
            .unwrap();

        let alerts = f.alerts.all();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].device_id.as_ref().unwrap().as_str(), "board1");
        assert_eq!(alerts[0].series_id.as_ref().unwrap().as_str(), "humidity");
        assert_eq!(alerts[0].message, "Humidity below threshold: 22%");
    }

    #[tokio::test]
    async fn should_drop_board_payload_without_valid_series() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message("home/sensors/board1", r#"{"sensors": {"a/b": 1, "c+d": 2}}"#))
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Dropped(DecodeError::MissingValue));
        assert!(f.readings.all().is_empty());
    }

    #[tokio::test]
    async fn should_raise_threshold_alert() {
        let mut settings = RouterSettings::default();
        settings.thresholds = vec![AlertThreshold {
            series: SeriesId::new("humidity").unwrap(),
            min: Some(30.0),
            max: Some(70.0),
        }];
        let f = fixture_with(settings, Vec::new());

        let outcome = f
            .router
            .dispatch(message("home/sensors/humidity", "82"))
            .await
            .unwrap();

        assert!(matches!(outcome, Dispatch::Recorded { alerts: 1, .. }));
        let alerts = f.alerts.all();
        assert_eq!(alerts[0].kind, "threshold_high");
        assert!(alerts[0].device_id.is_none());
    }

    #[tokio::test]
    async fn should_suppress_own_command_echo() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message(
                "home/devices/7/control",
                r#"{"action": "ON", "source": "external-api"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Suppressed);
        assert_eq!(f.devices.update_calls(), 0);
        assert_eq!(f.devices.get("7").unwrap().status, DeviceStatus::Inactive);
        assert_eq!(
            f.events.events()[0].event_type,
            EventType::EchoSuppressed
        );
    }

    #[tokio::test]
    async fn should_stay_idempotent_under_replayed_echoes() {
        let f = fixture();
        for _ in 0..10 {
            for payload in [
                r#"{"action": "ON", "source": "auto-control"}"#,
                r#"{"action": "OFF", "source": "external-api"}"#,
            ] {
                let outcome = f
                    .router
                    .dispatch(message("home/devices/7/control", payload))
                    .await
                    .unwrap();
                assert_eq!(outcome, Dispatch::Suppressed);
            }
        }
        assert_eq!(f.devices.update_calls(), 0);
        assert!(f.broker.published().is_empty());
    }

    #[tokio::test]
    async fn should_record_status_reported_by_device() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message(
                "home/devices/7/control",
                r#"{"action": "ON", "source": "button"}"#,
            ))
            .await
            .unwrap();

        assert!(matches!(outcome, Dispatch::DeviceUpdated(ref d) if d.status == DeviceStatus::Active));
        assert_eq!(f.devices.get("7").unwrap().status, DeviceStatus::Active);
        assert!(f.broker.published().is_empty());
    }

    #[tokio::test]
    async fn should_record_bare_status_token() {
        let f = fixture();
        f.router
            .dispatch(message("home/devices/2/control", "OFF"))
            .await
            .unwrap();
        assert_eq!(f.devices.get("2").unwrap().status, DeviceStatus::Inactive);
    }

    #[tokio::test]
    async fn should_drop_unrecognized_status() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(message("home/devices/7/control", r#"{"action": "DIM"}"#))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Dropped(DecodeError::MissingStatus));
        assert_eq!(f.devices.update_calls(), 0);
    }

    #[tokio::test]
    async fn should_report_unknown_device() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(message("home/devices/99/control", "ON"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Dispatch::DeviceUnknown(DeviceId::new("99").unwrap())
        );
    }

    #[tokio::test]
    async fn should_record_alert_from_alert_channel() {
        let f = fixture();

        let outcome = f
            .router
            .dispatch(message(
                "home/alerts",
                r#"{"device_id": "board1", "sensor_id": "temperature", "type": "temperature", "message": "Temperature above threshold: 35"}"#,
            ))
            .await
            .unwrap();

        let Dispatch::AlertRaised(record) = outcome else {
            panic!("expected alert, got {outcome:?}");
        };
        assert_eq!(record.kind, "temperature");
        assert_eq!(f.alerts.all().len(), 1);
    }

    #[tokio::test]
    async fn should_record_plain_text_alert_without_ids() {
        let f = fixture();
        let outcome = f
            .router
            .dispatch(message("home/alerts", "Smoke detected"))
            .await
            .unwrap();
        let Dispatch::AlertRaised(record) = outcome else {
            panic!("expected alert, got {outcome:?}");
        };
        assert_eq!(record.kind, "alert");
        assert!(record.device_id.is_none());
        assert!(record.series_id.is_none());
    }

    #[tokio::test]
    async fn should_process_channel_in_order_until_closed() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(8);
        tx.send(message("home/sensors/humidity", "1")).await.unwrap();
        tx.send(message("home/unknown", "2")).await.unwrap();
        tx.send(message("home/sensors/humidity", "3")).await.unwrap();
        drop(tx);

        f.router.run(rx).await;

        let values: Vec<f64> = f.readings.all().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }
}

//! In-memory port fakes shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use homebus_domain::alert::AlertRecord;
use homebus_domain::device::{Device, DeviceStatus};
use homebus_domain::error::{HomeBusError, PublishError};
use homebus_domain::event::Event;
use homebus_domain::id::{DeviceId, SeriesId};
use homebus_domain::reading::Reading;
use homebus_domain::time::Timestamp;

use crate::ports::{
    AlertRepository, CommandPublisher, DeviceRepository, EventPublisher, ReadingRepository,
};

fn unavailable() -> HomeBusError {
    HomeBusError::Storage(Box::new(std::io::Error::other("store unavailable")))
}

// ── Readings ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryReadingRepo {
    readings: Mutex<Vec<Reading>>,
}

impl InMemoryReadingRepo {
    pub fn all(&self) -> Vec<Reading> {
        self.readings.lock().unwrap().clone()
    }
}

impl ReadingRepository for InMemoryReadingRepo {
    fn insert_reading(
        &self,
        series_id: &SeriesId,
        value: f64,
        recorded_at: Timestamp,
    ) -> impl Future<Output = Result<Reading, HomeBusError>> + Send {
        let reading = Reading::new(series_id.clone(), value, recorded_at);
        self.readings.lock().unwrap().push(reading.clone());
        async { Ok(reading) }
    }

    fn recent_readings(
        &self,
        series_id: &SeriesId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, HomeBusError>> + Send {
        let mut result: Vec<Reading> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.series_id == *series_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        result.truncate(limit);
        async { Ok(result) }
    }
}

// ── Devices ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryDeviceRepo {
    devices: Mutex<BTreeMap<DeviceId, Device>>,
    updates: AtomicUsize,
}

impl InMemoryDeviceRepo {
    pub fn with(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices.into_iter().map(|d| (d.id.clone(), d)).collect()),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        let id = DeviceId::new(id).unwrap();
        self.devices.lock().unwrap().get(&id).cloned()
    }

    /// Number of `update_status` calls received.
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl DeviceRepository for InMemoryDeviceRepo {
    fn update_status(
        &self,
        id: &DeviceId,
        status: DeviceStatus,
    ) -> impl Future<Output = Result<Option<Device>, HomeBusError>> + Send {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut devices = self.devices.lock().unwrap();
        let result = devices.get_mut(id).map(|device| {
            device.status = status;
            device.clone()
        });
        async { Ok(result) }
    }

    fn actuators_by_class(
        &self,
        class: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeBusError>> + Send {
        let result: Vec<Device> = self
            .devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.class == class)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeBusError>> + Send {
        let mut devices = self.devices.lock().unwrap();
        let stored = devices
            .entry(device.id.clone())
            .and_modify(|existing| {
                existing.name.clone_from(&device.name);
                existing.class.clone_from(&device.class);
            })
            .or_insert(device)
            .clone();
        async { Ok(stored) }
    }
}

// ── Alerts ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAlertRepo {
    alerts: Mutex<Vec<AlertRecord>>,
    fail: bool,
}

impl InMemoryAlertRepo {
    pub fn failing() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn all(&self) -> Vec<AlertRecord> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertRepository for InMemoryAlertRepo {
    fn create_alert(
        &self,
        alert: AlertRecord,
    ) -> impl Future<Output = Result<AlertRecord, HomeBusError>> + Send {
        let result = if self.fail {
            Err(unavailable())
        } else {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(alert)
        };
        async { result }
    }
}

// ── Spy event publisher ────────────────────────────────────────────

#[derive(Default)]
pub struct SpyPublisher {
    events: Mutex<Vec<Event>>,
}

impl SpyPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for SpyPublisher {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HomeBusError>> + Send {
        self.events.lock().unwrap().push(event);
        async { Ok(()) }
    }
}

// ── Recording broker ───────────────────────────────────────────────

/// Captures published messages; can simulate a dropped connection.
pub struct RecordingBroker {
    published: Mutex<Vec<(String, serde_json::Value)>>,
    connected: AtomicBool,
}

impl Default for RecordingBroker {
    fn default() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }
}

impl RecordingBroker {
    pub fn disconnected() -> Self {
        let broker = Self::default();
        broker.connected.store(false, Ordering::SeqCst);
        broker
    }

    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().unwrap().clone()
    }
}

impl CommandPublisher for RecordingBroker {
    fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send {
        let result = if self.connected.load(Ordering::SeqCst) {
            let body = serde_json::from_slice(&payload).unwrap();
            self.published.lock().unwrap().push((topic, body));
            Ok(())
        } else {
            Err(PublishError::NotConnected)
        };
        async { result }
    }
}

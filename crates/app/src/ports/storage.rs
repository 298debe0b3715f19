//! Storage port: repository traits for persistence.

use std::future::Future;

use homebus_domain::alert::AlertRecord;
use homebus_domain::device::{Device, DeviceStatus};
use homebus_domain::error::HomeBusError;
use homebus_domain::id::{DeviceId, SeriesId};
use homebus_domain::reading::Reading;
use homebus_domain::time::Timestamp;

/// Append-only store of numeric readings.
pub trait ReadingRepository {
    /// Persist a new reading.
    fn insert_reading(
        &self,
        series_id: &SeriesId,
        value: f64,
        recorded_at: Timestamp,
    ) -> impl Future<Output = Result<Reading, HomeBusError>> + Send;

    /// Most recent readings of a series, ordered newest-first.
    fn recent_readings(
        &self,
        series_id: &SeriesId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, HomeBusError>> + Send;
}

/// Device records and their switch status.
pub trait DeviceRepository {
    /// Set the status of a device. Returns `None` if the device is unknown.
    fn update_status(
        &self,
        id: &DeviceId,
        status: DeviceStatus,
    ) -> impl Future<Output = Result<Option<Device>, HomeBusError>> + Send;

    /// All devices of the given class.
    fn actuators_by_class(
        &self,
        class: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeBusError>> + Send;

    /// Create a device or update its name and class, preserving its status.
    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeBusError>> + Send;
}

/// Persistence for raised alerts.
pub trait AlertRepository {
    /// Persist a new alert.
    fn create_alert(
        &self,
        alert: AlertRecord,
    ) -> impl Future<Output = Result<AlertRecord, HomeBusError>> + Send;
}

impl<T: ReadingRepository + Send + Sync> ReadingRepository for std::sync::Arc<T> {
    fn insert_reading(
        &self,
        series_id: &SeriesId,
        value: f64,
        recorded_at: Timestamp,
    ) -> impl Future<Output = Result<Reading, HomeBusError>> + Send {
        (**self).insert_reading(series_id, value, recorded_at)
    }

    fn recent_readings(
        &self,
        series_id: &SeriesId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, HomeBusError>> + Send {
        (**self).recent_readings(series_id, limit)
    }
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for std::sync::Arc<T> {
    fn update_status(
        &self,
        id: &DeviceId,
        status: DeviceStatus,
    ) -> impl Future<Output = Result<Option<Device>, HomeBusError>> + Send {
        (**self).update_status(id, status)
    }

    fn actuators_by_class(
        &self,
        class: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeBusError>> + Send {
        (**self).actuators_by_class(class)
    }

    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeBusError>> + Send {
        (**self).upsert(device)
    }
}

impl<T: AlertRepository + Send + Sync> AlertRepository for std::sync::Arc<T> {
    fn create_alert(
        &self,
        alert: AlertRecord,
    ) -> impl Future<Output = Result<AlertRecord, HomeBusError>> + Send {
        (**self).create_alert(alert)
    }
}

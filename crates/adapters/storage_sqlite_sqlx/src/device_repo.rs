//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homebus_app::ports::DeviceRepository;
use homebus_domain::device::{Device, DeviceStatus};
use homebus_domain::error::HomeBusError;
use homebus_domain::id::DeviceId;
use homebus_domain::time::now;

use crate::error::StorageError;
use crate::row::{decode, encode_timestamp};

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let class: String = row.try_get("class")?;
        let status: String = row.try_get("status")?;

        let status = DeviceStatus::parse(&status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown device status {status:?}").into())
        })?;

        Ok(Self(Device {
            id: decode(DeviceId::new(id))?,
            name,
            class,
            status,
        }))
    }
}

const UPDATE_STATUS: &str =
    "UPDATE devices SET status = ?, updated_at = ? WHERE id = ? RETURNING *";
const SELECT_BY_CLASS: &str = "SELECT * FROM devices WHERE class = ? ORDER BY id";
const UPSERT: &str = r"
    INSERT INTO devices (id, name, class, status, updated_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        name = excluded.name,
        class = excluded.class,
        updated_at = excluded.updated_at
    RETURNING *
";

/// `SQLite`-backed device repository.
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    fn update_status(
        &self,
        id: &DeviceId,
        status: DeviceStatus,
    ) -> impl Future<Output = Result<Option<Device>, HomeBusError>> + Send {
        let pool = self.pool.clone();
        let id = id.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(UPDATE_STATUS)
                .bind(status.to_string())
                .bind(encode_timestamp(now()))
                .bind(id.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn actuators_by_class(
        &self,
        class: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeBusError>> + Send {
        let pool = self.pool.clone();
        let class = class.to_string();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_CLASS)
                .bind(&class)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeBusError>> + Send {
        let pool = self.pool.clone();
        async move {
            device.validate()?;
            let row: Wrapper = sqlx::query_as(UPSERT)
                .bind(device.id.as_str())
                .bind(&device.name)
                .bind(&device.class)
                .bind(device.status.to_string())
                .bind(encode_timestamp(now()))
                .fetch_one(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.0)
        }
    }
}

//! `SQLite` implementation of [`AlertRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homebus_app::ports::AlertRepository;
use homebus_domain::alert::{AlertRecord, AlertStatus};
use homebus_domain::error::HomeBusError;
use homebus_domain::id::{AlertId, DeviceId, SeriesId};

use crate::error::StorageError;
use crate::row::{decode, decode_timestamp, encode_timestamp};

struct Wrapper(AlertRecord);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let device_id: Option<String> = row.try_get("device_id")?;
        let series_id: Option<String> = row.try_get("series_id")?;
        let kind: String = row.try_get("kind")?;
        let message: String = row.try_get("message")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        let status = match status.as_str() {
            "pending" => AlertStatus::Pending,
            "resolved" => AlertStatus::Resolved,
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown alert status {other:?}").into(),
                ));
            }
        };

        Ok(Self(AlertRecord {
            id: decode(AlertId::from_str(&id))?,
            device_id: decode(device_id.map(DeviceId::new).transpose())?,
            series_id: decode(series_id.map(SeriesId::new).transpose())?,
            kind,
            message,
            created_at: decode_timestamp(&created_at)?,
            status,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO alerts (id, device_id, series_id, kind, message, status, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";
const SELECT_RECENT: &str = "SELECT * FROM alerts ORDER BY created_at DESC, rowid DESC LIMIT ?";

/// `SQLite`-backed alert store.
pub struct SqliteAlertRepository {
    pool: SqlitePool,
}

impl SqliteAlertRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recently created alerts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HomeBusError::Storage`] if the query fails.
    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, HomeBusError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl AlertRepository for SqliteAlertRepository {
    fn create_alert(
        &self,
        alert: AlertRecord,
    ) -> impl Future<Output = Result<AlertRecord, HomeBusError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(alert.id.to_string())
                .bind(alert.device_id.as_ref().map(DeviceId::as_str))
                .bind(alert.series_id.as_ref().map(SeriesId::as_str))
                .bind(&alert.kind)
                .bind(&alert.message)
                .bind(alert.status.to_string())
                .bind(encode_timestamp(alert.created_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(alert)
        }
    }
}

//! `SQLite` implementation of [`ReadingRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homebus_app::ports::ReadingRepository;
use homebus_domain::error::HomeBusError;
use homebus_domain::id::{ReadingId, SeriesId};
use homebus_domain::reading::Reading;
use homebus_domain::time::Timestamp;

use crate::error::StorageError;
use crate::row::{decode, decode_timestamp, encode_timestamp};

struct Wrapper(Reading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let series_id: String = row.try_get("series_id")?;
        let value: f64 = row.try_get("value")?;
        let recorded_at: String = row.try_get("recorded_at")?;

        Ok(Self(Reading {
            id: decode(ReadingId::from_str(&id))?,
            series_id: decode(SeriesId::new(series_id))?,
            value,
            recorded_at: decode_timestamp(&recorded_at)?,
        }))
    }
}

const INSERT: &str =
    "INSERT INTO readings (id, series_id, value, recorded_at) VALUES (?, ?, ?, ?)";
const SELECT_RECENT_BY_SERIES: &str = r"
    SELECT * FROM readings
    WHERE series_id = ?
    ORDER BY recorded_at DESC, rowid DESC
    LIMIT ?
";

/// `SQLite`-backed reading store.
pub struct SqliteReadingRepository {
    pool: SqlitePool,
}

impl SqliteReadingRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ReadingRepository for SqliteReadingRepository {
    fn insert_reading(
        &self,
        series_id: &SeriesId,
        value: f64,
        recorded_at: Timestamp,
    ) -> impl Future<Output = Result<Reading, HomeBusError>> + Send {
        let pool = self.pool.clone();
        let reading = Reading::new(series_id.clone(), value, recorded_at);
        async move {
            sqlx::query(INSERT)
                .bind(reading.id.to_string())
                .bind(reading.series_id.as_str())
                .bind(reading.value)
                .bind(encode_timestamp(reading.recorded_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(reading)
        }
    }

    fn recent_readings(
        &self,
        series_id: &SeriesId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, HomeBusError>> + Send {
        let pool = self.pool.clone();
        let series_id = series_id.clone();
        async move {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT_BY_SERIES)
                .bind(series_id.as_str())
                .bind(limit)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}

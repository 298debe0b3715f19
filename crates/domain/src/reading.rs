//! Reading: one numeric sample of a series.

use serde::{Deserialize, Serialize};

use crate::id::{ReadingId, SeriesId};
use crate::time::Timestamp;

/// A persisted numeric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub series_id: SeriesId,
    pub value: f64,
    pub recorded_at: Timestamp,
}

impl Reading {
    /// Create a reading with a fresh id.
    #[must_use]
    pub fn new(series_id: SeriesId, value: f64, recorded_at: Timestamp) -> Self {
        Self {
            id: ReadingId::new(),
            series_id,
            value,
            recorded_at,
        }
    }
}

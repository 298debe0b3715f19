//! Per-series trend prediction.
//!
//! Each series owns a [`RollingWindow`] behind its own mutex; the series map
//! sits behind a read-mostly lock, so observations on different series never
//! contend beyond the first sample.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use homebus_domain::id::SeriesId;
use homebus_domain::prediction::{PredictionResult, PredictorConfig, RollingWindow};
use homebus_domain::reading::Reading;
use homebus_domain::time::Timestamp;

type Window = Arc<Mutex<RollingWindow>>;

/// Rolling windows for every predicted series.
pub struct TrendPredictor {
    config: PredictorConfig,
    windows: RwLock<HashMap<SeriesId, Window>>,
}

impl TrendPredictor {
    #[must_use]
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Whether a window exists for `series_id`.
    #[must_use]
    pub fn contains(&self, series_id: &SeriesId) -> bool {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(series_id)
    }

    fn window(&self, series_id: &SeriesId) -> Window {
        if let Some(window) = self
            .windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(series_id)
        {
            return Arc::clone(window);
        }
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            windows
                .entry(series_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RollingWindow::new(self.config.capacity)))),
        )
    }

    /// Record `value` and predict the next sample against `threshold`.
    pub fn observe(
        &self,
        series_id: &SeriesId,
        threshold: f64,
        value: f64,
        at: Timestamp,
    ) -> PredictionResult {
        let window = self.window(series_id);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.observe(series_id, value, at, threshold, &self.config)
    }

    /// Seed an empty window from stored readings given newest-first.
    ///
    /// Windows that already hold samples are left untouched.
    pub fn hydrate(&self, series_id: &SeriesId, readings: &[Reading]) {
        let window = self.window(series_id);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        if !window.is_empty() {
            return;
        }
        for reading in readings
            .iter()
            .filter(|reading| reading.series_id == *series_id && reading.value.is_finite())
            .take(self.config.capacity)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
        {
            window.push(reading.value, reading.recorded_at);
        }
        tracing::debug!(series = %series_id, samples = window.len(), "hydrated window");
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

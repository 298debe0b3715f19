//! Rolling-window trend prediction.
//!
//! A [`RollingWindow`] keeps the most recent samples of one series. Once it
//! holds enough samples it fits an ordinary least squares line over the
//! last few of them and extrapolates one step ahead. Confidence drops as
//! the recent samples spread out.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::id::SeriesId;
use crate::time::Timestamp;

/// Tunables of the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Maximum samples kept per series.
    pub capacity: usize,
    /// Samples required before a prediction is made.
    pub min_samples: usize,
    /// Most recent samples the trend line is fitted over.
    pub trend_samples: usize,
    /// Variance at which confidence reaches zero.
    pub variance_normalizer: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            capacity: 24,
            min_samples: 5,
            trend_samples: 5,
            variance_normalizer: 10.0,
        }
    }
}

/// Outcome of one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub series_id: SeriesId,
    pub current_value: f64,
    pub predicted_value: f64,
    /// Slope per sample of the fitted line.
    pub trend: f64,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub threshold: f64,
    pub will_exceed_threshold: bool,
    /// Samples in the window when the prediction was made.
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    value: f64,
    at: Timestamp,
}

/// Bounded, oldest-first window of samples for one series.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the newest sample.
    #[must_use]
    pub fn latest_at(&self) -> Option<Timestamp> {
        self.samples.back().map(|sample| sample.at)
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, value: f64, at: Timestamp) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { value, at });
    }

    /// Append `value` and predict the next one.
    pub fn observe(
        &mut self,
        series_id: &SeriesId,
        value: f64,
        at: Timestamp,
        threshold: f64,
        config: &PredictorConfig,
    ) -> PredictionResult {
        self.push(value, at);
        self.predict(series_id, value, threshold, config)
    }

    fn predict(
        &self,
        series_id: &SeriesId,
        current_value: f64,
        threshold: f64,
        config: &PredictorConfig,
    ) -> PredictionResult {
        let samples = self.samples.len();
        if samples < config.min_samples.max(1) {
            return PredictionResult {
                series_id: series_id.clone(),
                current_value,
                predicted_value: current_value,
                trend: 0.0,
                confidence: 0.0,
                threshold,
                will_exceed_threshold: false,
                samples,
            };
        }

        let recent: Vec<f64> = self
            .samples
            .iter()
            .skip(samples.saturating_sub(config.trend_samples))
            .map(|sample| sample.value)
            .collect();
        let trend = slope(&recent);
        let predicted_value = current_value + trend;
        let confidence = if config.variance_normalizer > 0.0 {
            (1.0 - population_variance(&recent) / config.variance_normalizer).clamp(0.0, 1.0)
        } else {
            0.0
        };

        PredictionResult {
            series_id: series_id.clone(),
            current_value,
            predicted_value,
            trend,
            confidence,
            threshold,
            will_exceed_threshold: predicted_value > threshold,
            samples,
        }
    }
}

/// Least squares slope of `values` against their index.
#[allow(clippy::cast_precision_loss)]
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (index, value) in values.iter().enumerate() {
        let x = index as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_xx += x * x;
    }
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

#[allow(clippy::cast_precision_loss)]
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n
}

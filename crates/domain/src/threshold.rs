//! Static min/max limits on a series.

use serde::{Deserialize, Serialize};

use crate::id::SeriesId;

/// Limits configured for one series. Either bound may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub series: SeriesId,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Which bound a reading crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachKind {
    High,
    Low,
}

impl BreachKind {
    /// Alert kind recorded for this breach.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::High => "threshold_high",
            Self::Low => "threshold_low",
        }
    }
}

/// A reading outside its configured limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub kind: BreachKind,
    pub value: f64,
    pub limit: f64,
}

impl AlertThreshold {
    /// Compare `value` against the limits. Bounds are exclusive.
    #[must_use]
    pub fn evaluate(&self, value: f64) -> Option<Breach> {
        if let Some(max) = self.max.filter(|max| value > *max) {
            return Some(Breach {
                kind: BreachKind::High,
                value,
                limit: max,
            });
        }
        self.min.filter(|min| value < *min).map(|min| Breach {
            kind: BreachKind::Low,
            value,
            limit: min,
        })
    }

    /// Human-readable description of `breach`.
    #[must_use]
    pub fn describe(&self, breach: &Breach) -> String {
        let direction = match breach.kind {
            BreachKind::High => "above",
            BreachKind::Low => "below",
        };
        format!(
            "{} {direction} threshold: {} (limit {})",
            self.series, breach.value, breach.limit
        )
    }
}

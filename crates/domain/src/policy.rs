//! Confidence-gated auto-actuation.

use serde::{Deserialize, Serialize};

use crate::command::{Action, Command, Origin};
use crate::device::Device;
use crate::prediction::PredictionResult;
use crate::time::Timestamp;

/// Turns predictions into commands for one class of actuators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoControlPolicy {
    /// Confidence a prediction must strictly exceed.
    pub confidence_gate: f64,
    /// Class of devices switched on when the policy fires.
    pub actuator_class: String,
}

impl AutoControlPolicy {
    #[must_use]
    pub fn new(confidence_gate: f64, actuator_class: impl Into<String>) -> Self {
        Self {
            confidence_gate,
            actuator_class: actuator_class.into(),
        }
    }

    /// Whether `prediction` is strong enough to act on.
    #[must_use]
    pub fn fires(&self, prediction: &PredictionResult) -> bool {
        prediction.will_exceed_threshold && prediction.confidence > self.confidence_gate
    }

    /// Commands switching on every inactive candidate of the configured class.
    ///
    /// Returns nothing when the prediction does not pass the gate.
    #[must_use]
    pub fn decide(
        &self,
        prediction: &PredictionResult,
        candidates: &[Device],
        issued_at: Timestamp,
    ) -> Vec<Command> {
        if !self.fires(prediction) {
            return Vec::new();
        }
        candidates
            .iter()
            .filter(|device| device.class == self.actuator_class && !device.status.is_active())
            .map(|device| {
                Command::new(device.id.clone(), Action::On, Origin::AutoControl, issued_at)
            })
            .collect()
    }
}

//! Threshold gate: one independent decision per cycle.
//!
//! There is no hysteresis or hold time. A signal sitting right at the threshold
//! can toggle the output every cycle.

use crate::audio::{Amplitude, MAX_AMPLITUDE};
use crate::error::CaptureError;
use serde::Serialize;

/// Operator threshold on the 0-100 amplitude scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Threshold(u8);

impl Threshold {
    pub fn new(value: u8) -> Result<Self, CaptureError> {
        if value > MAX_AMPLITUDE {
            return Err(CaptureError::config(format!(
                "threshold must be between 0 and {MAX_AMPLITUDE}, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Output state for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Active,
    Inactive,
}

impl GateState {
    pub fn is_active(self) -> bool {
        matches!(self, GateState::Active)
    }
}

/// `Active` when `peak >= threshold`; ties count as active.
pub fn gate(peak: Amplitude, threshold: Threshold) -> GateState {
    if peak.value() >= threshold.value() {
        GateState::Active
    } else {
        GateState::Inactive
    }
}

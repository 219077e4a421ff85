//! Scheduler settings
//!
//! Tolerances and clamps shared by every animation a scheduler drives.
//! Deserializable so hosts can keep them in a config file.

use serde::{Deserialize, Serialize};
use wave_core::{Result, WaveError};

/// Tunables for one scheduler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Upper bound for a single frame's `dt`, in seconds. Long stalls
    /// (debugger pauses, backgrounded windows) are stepped as one frame of
    /// this length instead of one huge jump.
    pub max_frame_delta: f64,
    /// Pixel grid used by animations with integralized values
    pub display_scale: f64,
    /// Spring is at rest once every component is this close to its target
    pub spring_position_epsilon: f64,
    /// ...and every velocity component is below this
    pub spring_velocity_epsilon: f64,
    /// Decay stops once its velocity magnitude drops below this
    pub decay_velocity_threshold: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_frame_delta: 0.1,
            display_scale: 1.0,
            spring_position_epsilon: 0.001,
            spring_velocity_epsilon: 0.001,
            decay_velocity_threshold: 0.3,
        }
    }
}

impl SchedulerSettings {
    /// Check every field is finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("max_frame_delta", self.max_frame_delta),
            ("display_scale", self.display_scale),
            ("spring_position_epsilon", self.spring_position_epsilon),
            ("spring_velocity_epsilon", self.spring_velocity_epsilon),
            ("decay_velocity_threshold", self.decay_velocity_threshold),
        ];

        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(WaveError::InvalidSetting(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn with_max_frame_delta(mut self, max_frame_delta: f64) -> Self {
        self.max_frame_delta = max_frame_delta;
        self
    }

    pub fn with_display_scale(mut self, display_scale: f64) -> Self {
        self.display_scale = display_scale;
        self
    }
}

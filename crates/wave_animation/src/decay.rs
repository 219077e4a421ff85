//! Velocity decay
//!
//! Exponential friction calibrated in milliseconds, the deceleration model
//! scroll views use for flicks. The closed-form displacement keeps the final
//! resting point independent of the frame rate.

use wave_core::animatable::component;
use wave_core::vector::{self, AnimationVector};
use wave_core::{Result, WaveError};

use crate::driver::{Driver, DriverKind, Motion};
use crate::settings::SchedulerSettings;

/// Deceleration rate of a normal scroll view
pub const NORMAL_DECELERATION_RATE: f64 = 0.998;

/// Deceleration rate of a fast scroll view
pub const FAST_DECELERATION_RATE: f64 = 0.99;

/// Decay parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayFunction {
    rate: f64,
    /// `ln(rate) * 1000`, cached
    decay: f64,
}

impl DecayFunction {
    /// Create a decay function. Rates outside `(0, 1)` are clamped into it.
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() {
            rate.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON)
        } else {
            NORMAL_DECELERATION_RATE
        };
        Self {
            rate,
            decay: rate.ln() * 1000.0,
        }
    }

    pub fn try_new(rate: f64) -> Result<Self> {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(WaveError::InvalidDecayRate(rate));
        }
        Ok(Self::new(rate))
    }

    pub fn normal() -> Self {
        Self::new(NORMAL_DECELERATION_RATE)
    }

    pub fn fast() -> Self {
        Self::new(FAST_DECELERATION_RATE)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Advance `value` and `velocity` by `dt` seconds
    pub fn update(&self, value: &mut [f64], velocity: &mut [f64], dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let factor = self.rate.powf(dt * 1000.0);
        let displacement = (factor - 1.0) / self.decay;
        for (x, v) in value.iter_mut().zip(velocity.iter_mut()) {
            *x += *v * displacement;
            *v *= factor;
        }
    }

    /// Where a decay starting at `value` with `velocity` comes to rest
    pub fn destination(&self, value: &[f64], velocity: &[f64]) -> AnimationVector {
        value
            .iter()
            .enumerate()
            .map(|(i, x)| x - component(velocity, i) / self.decay)
            .collect()
    }

    /// The initial velocity that makes a decay from `from` rest at `to`
    pub fn velocity_to_reach(&self, from: &[f64], to: &[f64]) -> AnimationVector {
        let len = from.len().max(to.len());
        (0..len)
            .map(|i| (component(from, i) - component(to, i)) * self.decay)
            .collect()
    }

    /// Seconds until the velocity magnitude falls below `threshold`
    pub fn duration(&self, velocity: &[f64], threshold: f64) -> f64 {
        let speed = vector::magnitude_squared(velocity).sqrt();
        if speed <= threshold || threshold <= 0.0 {
            return 0.0;
        }
        (threshold / speed).ln() / self.decay
    }
}

impl Default for DecayFunction {
    fn default() -> Self {
        Self::normal()
    }
}

/// How a value written under a decay scope is interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecayMode {
    /// The written value is the initial velocity
    #[default]
    Velocity,
    /// The written value is the resting point; the velocity is solved
    Value,
}

// =============================================================================
// Driver
// =============================================================================

/// Drives a [`Motion`] with velocity decay
///
/// The motion's target always holds the projected resting point.
#[derive(Clone, Debug)]
pub struct DecayDriver {
    function: DecayFunction,
}

impl DecayDriver {
    pub fn new(function: DecayFunction) -> Self {
        Self { function }
    }

    pub fn function(&self) -> &DecayFunction {
        &self.function
    }

    pub fn set_function(&mut self, function: DecayFunction) {
        self.function = function;
    }

    /// Point the motion at `destination`, solving the velocity to get there
    pub fn aim_at(&self, motion: &mut Motion, destination: AnimationVector) {
        motion.set_target(destination);
        motion.velocity = self
            .function
            .velocity_to_reach(&motion.value, &motion.target);
    }

    /// Replace the velocity and recompute the resting point
    pub fn throw(&self, motion: &mut Motion, velocity: AnimationVector) {
        motion.set_velocity(velocity);
        self.project(motion);
    }

    fn project(&self, motion: &mut Motion) {
        motion.target = self.function.destination(&motion.value, &motion.velocity);
    }
}

impl Driver for DecayDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Decay
    }

    fn step(&mut self, motion: &mut Motion, dt: f64, settings: &SchedulerSettings) -> bool {
        self.function
            .update(&mut motion.value, &mut motion.velocity, dt);

        if !vector::is_finite(&motion.value) || !vector::is_finite(&motion.velocity) {
            tracing::warn!("decay produced a non-finite state, stopping");
            if vector::is_finite(&motion.target) {
                motion.snap_to_target();
            } else {
                motion.value = motion.from.clone();
                motion.velocity.iter_mut().for_each(|v| *v = 0.0);
            }
            return true;
        }

        let speed = vector::magnitude_squared(&motion.velocity).sqrt();
        if speed < settings.decay_velocity_threshold {
            motion.velocity.iter_mut().for_each(|v| *v = 0.0);
            motion.target = motion.value.clone();
            return true;
        }
        false
    }

    fn retarget(&mut self, motion: &mut Motion) {
        self.project(motion);
    }

    fn restart(&mut self, motion: &mut Motion, _autoreverse: bool) {
        motion.value = motion.from.clone();
        motion.velocity = motion.from_velocity.clone();
        self.project(motion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_destination_and_velocity_are_inverse() {
        let function = DecayFunction::normal();
        let velocity = function.velocity_to_reach(&[10.0], &[250.0]);
        assert!(velocity[0] > 0.0);

        let destination = function.destination(&[10.0], &velocity);
        assert!((destination[0] - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_rest_point_independent_of_frame_rate() {
        let function = DecayFunction::normal();
        let expected = function.destination(&[0.0], &[1000.0])[0];

        for dt in [1.0 / 30.0, 1.0 / 60.0, 1.0 / 120.0] {
            let mut value = [0.0];
            let mut velocity = [1000.0];
            for _ in 0..(20.0 / dt) as usize {
                function.update(&mut value, &mut velocity, dt);
            }
            assert!((value[0] - expected).abs() < 0.01);
        }
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(DecayFunction::try_new(1.0).is_err());
        assert!(DecayFunction::try_new(0.0).is_err());
        assert!(DecayFunction::try_new(f64::NAN).is_err());
        assert!(DecayFunction::try_new(0.99).is_ok());
    }

    #[test]
    fn test_duration() {
        let function = DecayFunction::fast();
        assert_eq!(function.duration(&[0.1], 0.3), 0.0);

        let t = function.duration(&[100.0], 0.3);
        let mut value = [0.0];
        let mut velocity = [100.0];
        function.update(&mut value, &mut velocity, t);
        assert!((velocity[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_driver_finishes_below_threshold() {
        let settings = SchedulerSettings::default();
        let mut driver = DecayDriver::new(DecayFunction::normal());
        let mut motion = Motion::new(smallvec![0.0], smallvec![0.0]);
        driver.throw(&mut motion, smallvec![500.0]);
        motion.mark_start();
        let destination = motion.target[0];

        let mut frames = 0;
        while !driver.step(&mut motion, 1.0 / 60.0, &settings) {
            frames += 1;
            assert!(frames < 10_000);
        }
        assert_eq!(motion.velocity.as_slice(), &[0.0]);
        assert!((motion.value[0] - destination).abs() < 1.0);
    }

    #[test]
    fn test_aim_at_solves_velocity() {
        let driver = DecayDriver::new(DecayFunction::normal());
        let mut motion = Motion::new(smallvec![0.0, 0.0], smallvec![0.0, 0.0]);
        driver.aim_at(&mut motion, smallvec![100.0, -50.0]);

        assert!(motion.velocity[0] > 0.0);
        assert!(motion.velocity[1] < 0.0);
        assert_eq!(motion.target.as_slice(), &[100.0, -50.0]);
    }
}

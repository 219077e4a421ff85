//! Timing functions and the easing driver
//!
//! Easing animations map elapsed time to a completion fraction, then the
//! fraction through a timing curve to an interpolation amount.

use wave_core::vector;

use crate::driver::{Driver, DriverKind, Motion};
use crate::settings::SchedulerSettings;

/// Maps linear progress in `[0, 1]` to eased progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimingFunction {
    Linear,
    /// Cubic bezier with control points `(x1, y1)` and `(x2, y2)`; the end
    /// points are fixed at `(0, 0)` and `(1, 1)`.
    Bezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl TimingFunction {
    pub const fn bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        TimingFunction::Bezier { x1, y1, x2, y2 }
    }

    pub const fn linear() -> Self {
        TimingFunction::Linear
    }

    pub const fn ease_in() -> Self {
        Self::bezier(0.42, 0.0, 1.0, 1.0)
    }

    pub const fn ease_out() -> Self {
        Self::bezier(0.0, 0.0, 0.58, 1.0)
    }

    pub const fn ease_in_out() -> Self {
        Self::bezier(0.42, 0.0, 0.58, 1.0)
    }

    /// Fast start, long gentle tail
    pub const fn swift_out() -> Self {
        Self::bezier(0.4, 0.0, 0.2, 1.0)
    }

    /// Look up a named curve (`linear`, `ease-in`, `ease-out`, `ease-in-out`,
    /// `swift-out`). Underscores work in place of dashes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.replace('_', "-").to_ascii_lowercase().as_str() {
            "linear" => Some(Self::linear()),
            "ease-in" => Some(Self::ease_in()),
            "ease-out" => Some(Self::ease_out()),
            "ease-in-out" => Some(Self::ease_in_out()),
            "swift-out" => Some(Self::swift_out()),
            _ => None,
        }
    }

    /// Eased progress at `x`, solved to within `epsilon` on the time axis
    pub fn solve(&self, x: f64, epsilon: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match *self {
            TimingFunction::Linear => x,
            TimingFunction::Bezier { x1, y1, x2, y2 } => {
                if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
                    return x;
                }
                let t = solve_curve_x(x, x1, x2, epsilon);
                cubic_bezier(y1, y2, t)
            }
        }
    }

    /// Eased progress at `x` with a precision suited to an animation of
    /// `duration` seconds
    pub fn solve_for_duration(&self, x: f64, duration: f64) -> f64 {
        let epsilon = if duration > 0.0 {
            1.0 / (duration * 1000.0)
        } else {
            1e-6
        };
        self.solve(x, epsilon)
    }
}

impl Default for TimingFunction {
    fn default() -> Self {
        Self::ease_in_out()
    }
}

/// One axis of a unit cubic bezier: P0 = 0, P3 = 1
#[inline]
fn cubic_bezier(p1: f64, p2: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

/// Find the curve parameter whose x equals `x`. Control x values in
/// `[0, 1]` keep x monotonic, so bisection always converges.
fn solve_curve_x(x: f64, x1: f64, x2: f64, epsilon: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = 1.0;
    let mut mid = x;
    for _ in 0..64 {
        let current = cubic_bezier(x1, x2, mid);
        if (current - x).abs() < epsilon {
            break;
        }
        if current < x {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    mid
}

// =============================================================================
// Driver
// =============================================================================

/// Drives a [`Motion`] along a timing curve over a fixed duration
#[derive(Clone, Debug)]
pub struct EasingDriver {
    timing: TimingFunction,
    duration: f64,
    fraction: f64,
    reversed: bool,
}

impl EasingDriver {
    pub fn new(timing: TimingFunction, duration: f64) -> Self {
        Self {
            timing,
            duration,
            fraction: 0.0,
            reversed: false,
        }
    }

    pub fn timing(&self) -> TimingFunction {
        self.timing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Linear completion in `[0, 1]`
    pub fn fraction_complete(&self) -> f64 {
        self.fraction
    }

    /// Whether an autoreversing animation is currently playing backwards
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Change curve and duration, keeping the current fraction
    pub fn reconfigure(&mut self, timing: TimingFunction, duration: f64) {
        self.timing = timing;
        self.duration = duration;
    }

    /// Jump to `fraction` and place the value on the curve there
    pub fn scrub(&mut self, motion: &mut Motion, fraction: f64) {
        self.fraction = fraction.clamp(0.0, 1.0);
        motion.value = self.value_at(motion);
    }

    fn eased(&self) -> f64 {
        self.timing.solve_for_duration(self.fraction, self.duration)
    }

    fn value_at(&self, motion: &Motion) -> wave_core::AnimationVector {
        vector::lerp(&motion.from, &motion.target, self.eased())
    }

    fn end_value(&self, motion: &Motion) -> wave_core::AnimationVector {
        if self.reversed {
            motion.from.clone()
        } else {
            motion.target.clone()
        }
    }
}

impl Driver for EasingDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Easing
    }

    fn step(&mut self, motion: &mut Motion, dt: f64, _settings: &SchedulerSettings) -> bool {
        if self.duration <= 0.0 {
            self.fraction = if self.reversed { 0.0 } else { 1.0 };
            motion.value = self.end_value(motion);
            motion.velocity.iter_mut().for_each(|v| *v = 0.0);
            return true;
        }
        if dt <= 0.0 {
            return false;
        }

        let previous = std::mem::take(&mut motion.value);
        let progress = dt / self.duration;
        self.fraction = if self.reversed {
            (self.fraction - progress).max(0.0)
        } else {
            (self.fraction + progress).min(1.0)
        };

        let finished = if self.reversed {
            self.fraction <= 0.0
        } else {
            self.fraction >= 1.0
        };
        motion.value = if finished {
            self.end_value(motion)
        } else {
            self.value_at(motion)
        };

        motion.velocity = motion
            .value
            .iter()
            .zip(previous.iter())
            .map(|(now, before)| (now - before) / dt)
            .collect();
        finished
    }

    fn retarget(&mut self, motion: &mut Motion) {
        motion.from = motion.value.clone();
        self.fraction = 0.0;
        self.reversed = false;
    }

    fn restart(&mut self, motion: &mut Motion, autoreverse: bool) {
        if autoreverse {
            self.reversed = !self.reversed;
        }
        self.fraction = if self.reversed { 1.0 } else { 0.0 };
        motion.value = self.value_at(motion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_linear_midpoint() {
        let settings = SchedulerSettings::default();
        let mut driver = EasingDriver::new(TimingFunction::linear(), 1.0);
        let mut motion = Motion::new(smallvec![0.0], smallvec![10.0]);

        for _ in 0..5 {
            assert!(!driver.step(&mut motion, 0.1, &settings));
        }
        assert!((motion.value[0] - 5.0).abs() < 1e-9);
        assert!((motion.velocity[0] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_finishes_exactly_at_target() {
        let settings = SchedulerSettings::default();
        let mut driver = EasingDriver::new(TimingFunction::ease_in_out(), 0.25);
        let mut motion = Motion::new(smallvec![0.0, 0.0], smallvec![3.0, -3.0]);

        let mut frames = 0;
        while !driver.step(&mut motion, 1.0 / 60.0, &settings) {
            frames += 1;
        }
        assert!((14..=15).contains(&frames));
        assert_eq!(motion.value.as_slice(), &[3.0, -3.0]);
    }

    #[test]
    fn test_named_curves_hit_endpoints() {
        for curve in [
            TimingFunction::ease_in(),
            TimingFunction::ease_out(),
            TimingFunction::ease_in_out(),
            TimingFunction::swift_out(),
        ] {
            assert!(curve.solve(0.0, 1e-6).abs() < 1e-6);
            assert!((curve.solve(1.0, 1e-6) - 1.0).abs() < 1e-6);
        }
        // Symmetric curve passes through the middle
        let mid = TimingFunction::ease_in_out().solve(0.5, 1e-6);
        assert!((mid - 0.5).abs() < 1e-4);
        // Ease-in lags behind linear, ease-out runs ahead
        assert!(TimingFunction::ease_in().solve(0.3, 1e-6) < 0.3);
        assert!(TimingFunction::ease_out().solve(0.3, 1e-6) > 0.3);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            TimingFunction::from_name("ease_in_out"),
            Some(TimingFunction::ease_in_out())
        );
        assert_eq!(
            TimingFunction::from_name("linear"),
            Some(TimingFunction::Linear)
        );
        assert_eq!(TimingFunction::from_name("bounce"), None);
    }

    #[test]
    fn test_scrub_sets_value() {
        let mut driver = EasingDriver::new(TimingFunction::linear(), 2.0);
        let mut motion = Motion::new(smallvec![0.0], smallvec![8.0]);
        driver.scrub(&mut motion, 0.25);
        assert_eq!(motion.value.as_slice(), &[2.0]);
        driver.scrub(&mut motion, 4.0);
        assert_eq!(driver.fraction_complete(), 1.0);
    }

    #[test]
    fn test_retarget_starts_from_current_value() {
        let settings = SchedulerSettings::default();
        let mut driver = EasingDriver::new(TimingFunction::linear(), 1.0);
        let mut motion = Motion::new(smallvec![0.0], smallvec![10.0]);
        driver.step(&mut motion, 0.5, &settings);

        motion.set_target(smallvec![0.0]);
        driver.retarget(&mut motion);
        assert_eq!(motion.from.as_slice(), &[5.0]);
        assert_eq!(driver.fraction_complete(), 0.0);

        driver.step(&mut motion, 0.5, &settings);
        assert!((motion.value[0] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_autoreverse_plays_backwards() {
        let settings = SchedulerSettings::default();
        let mut driver = EasingDriver::new(TimingFunction::linear(), 1.0);
        let mut motion = Motion::new(smallvec![0.0], smallvec![10.0]);
        driver.step(&mut motion, 1.0, &settings);

        driver.restart(&mut motion, true);
        assert!(driver.is_reversed());
        assert_eq!(motion.value.as_slice(), &[10.0]);

        driver.step(&mut motion, 0.25, &settings);
        assert!((motion.value[0] - 7.5).abs() < 1e-9);
        assert!(driver.step(&mut motion, 0.75, &settings));
        assert_eq!(motion.value.as_slice(), &[0.0]);
    }
}

//! Spring physics
//!
//! Damped harmonic oscillator parameterized by damping ratio and response,
//! integrated with semi-implicit Euler in fixed-size substeps so large
//! frame deltas stay stable.

use std::f64::consts::PI;

use wave_core::vector;
use wave_core::{Result, WaveError};

use crate::driver::{Driver, DriverKind, Motion};
use crate::settings::SchedulerSettings;

/// Fraction of the initial displacement left when a spring counts as settled
const SETTLING_PERCENTAGE: f64 = 1e-4;

/// Largest integration step. Longer frames are split into substeps.
const MAX_SUBSTEP: f64 = 1.0 / 120.0;

/// Longest span a single update integrates. Anything past it is dropped.
const MAX_UPDATE: f64 = 10.0;

/// Spring parameters
///
/// Construct from a `(damping_ratio, response)` pair, a stiffness, or a
/// perceptual duration and bounce. Stiffness, damping and settling duration
/// are derived once at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    damping_ratio: f64,
    response: f64,
    mass: f64,
    stiffness: f64,
    damping: f64,
    settling_duration: f64,
}

impl Spring {
    /// Create a spring with unit mass
    ///
    /// `damping_ratio` below 1 oscillates, 1 is critically damped, above 1
    /// is overdamped. `response` is the period of the undamped spring in
    /// seconds; a response of 0 makes every step snap to the target.
    pub fn new(damping_ratio: f64, response: f64) -> Self {
        Self::with_parameters(damping_ratio, response, 1.0)
    }

    /// Like [`Spring::new`] but rejects parameters the integrator cannot use
    pub fn try_new(damping_ratio: f64, response: f64) -> Result<Self> {
        if !damping_ratio.is_finite() || damping_ratio <= 0.0 {
            return Err(WaveError::InvalidSpring(format!(
                "damping ratio must be positive, got {damping_ratio}"
            )));
        }
        if !response.is_finite() || response < 0.0 {
            return Err(WaveError::InvalidSpring(format!(
                "response must be zero or positive, got {response}"
            )));
        }
        Ok(Self::new(damping_ratio, response))
    }

    /// Create a spring from a stiffness instead of a response
    pub fn from_stiffness(damping_ratio: f64, stiffness: f64, mass: f64) -> Self {
        let response = 2.0 * PI * (mass / stiffness).sqrt();
        Self::with_parameters(damping_ratio, response, mass)
    }

    /// Create a spring from a perceptual duration and bounce.
    ///
    /// A bounce of 0 is critically damped, positive values up to 1 add
    /// oscillation and negative values down to -1 overdamp.
    pub fn from_duration(duration: f64, bounce: f64) -> Self {
        Self::new(1.0 - bounce.clamp(-1.0, 1.0), duration)
    }

    /// Return a copy with a different mass, keeping ratio and response
    pub fn with_mass(self, mass: f64) -> Self {
        Self::with_parameters(self.damping_ratio, self.response, mass)
    }

    fn with_parameters(damping_ratio: f64, response: f64, mass: f64) -> Self {
        let (stiffness, damping) = if response > 0.0 {
            let omega = 2.0 * PI / response;
            (
                omega * omega * mass,
                4.0 * PI * damping_ratio * mass / response,
            )
        } else {
            (f64::INFINITY, f64::INFINITY)
        };

        Self {
            damping_ratio,
            response,
            mass,
            stiffness,
            damping,
            settling_duration: settling_time(damping_ratio, stiffness, mass),
        }
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Slightly underdamped spring for interactive animations (dragging)
    pub fn interactive() -> Self {
        Self::new(0.8, 0.28)
    }

    /// Spring with a noticeable bounce
    pub fn bouncy() -> Self {
        Self::new(0.7, 0.5)
    }

    /// Bouncy spring with a tunable pace and extra bounce
    pub fn bouncy_with(duration: f64, extra_bounce: f64) -> Self {
        Self::new(0.7 - extra_bounce, duration)
    }

    /// Critically damped spring, no bounce
    pub fn smooth() -> Self {
        Self::new(1.0, 0.5)
    }

    /// Smooth spring with a tunable pace and extra bounce
    pub fn smooth_with(duration: f64, extra_bounce: f64) -> Self {
        Self::new(1.0 - extra_bounce, duration)
    }

    /// Spring with a small bounce that feels quick
    pub fn snappy() -> Self {
        Self::new(0.85, 0.5)
    }

    /// Snappy spring with a tunable pace and extra bounce
    pub fn snappy_with(duration: f64, extra_bounce: f64) -> Self {
        Self::new(0.85 - extra_bounce, duration)
    }

    /// Spring that jumps straight to its target
    pub fn non_animated() -> Self {
        Self::new(1.0, 0.0)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    pub fn response(&self) -> f64 {
        self.response
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Time after which an animation using this spring is considered at rest
    pub fn settling_duration(&self) -> f64 {
        self.settling_duration
    }

    /// Whether the spring moves at all (non-zero response)
    pub fn is_animated(&self) -> bool {
        self.response > 0.0
    }

    /// Advance `value` and `velocity` towards `target` by `dt` seconds.
    ///
    /// Missing target components read as zero.
    pub fn update(&self, value: &mut [f64], velocity: &mut [f64], target: &[f64], dt: f64) {
        if !self.is_animated() {
            for (i, v) in value.iter_mut().enumerate() {
                *v = target.get(i).copied().unwrap_or(0.0);
            }
            velocity.fill(0.0);
            return;
        }
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let dt = dt.min(MAX_UPDATE);
        let substeps = (dt / MAX_SUBSTEP).ceil().max(1.0);
        let h = dt / substeps;

        for _ in 0..substeps as usize {
            for (i, (x, v)) in value.iter_mut().zip(velocity.iter_mut()).enumerate() {
                let displacement = *x - target.get(i).copied().unwrap_or(0.0);
                let acceleration = (-self.stiffness * displacement - self.damping * *v) / self.mass;
                *v += acceleration * h;
                *x += *v * h;
            }
        }
    }
}

impl Default for Spring {
    fn default() -> Self {
        Self::smooth()
    }
}

fn settling_time(damping_ratio: f64, stiffness: f64, mass: f64) -> f64 {
    // Non-animated springs still need a non-zero duration so the first
    // frame is scheduled.
    if stiffness.is_infinite() {
        return 1.0;
    }

    if damping_ratio >= 1.0 {
        return settling_time(1.0 - f64::EPSILON, stiffness, mass) * 1.25;
    }

    let natural_frequency = (stiffness / mass).sqrt();
    -SETTLING_PERCENTAGE.ln() / (damping_ratio * natural_frequency)
}

// =============================================================================
// Driver
// =============================================================================

/// Drives a [`Motion`] with spring physics
#[derive(Clone, Debug)]
pub struct SpringDriver {
    spring: Spring,
    elapsed: f64,
}

impl SpringDriver {
    pub fn new(spring: Spring) -> Self {
        Self {
            spring,
            elapsed: 0.0,
        }
    }

    pub fn spring(&self) -> &Spring {
        &self.spring
    }

    /// Swap the spring parameters mid-flight. Value and velocity carry over.
    pub fn set_spring(&mut self, spring: Spring) {
        self.spring = spring;
    }

    /// Seconds since the driver was started or last retargeted
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn at_rest(motion: &Motion, settings: &SchedulerSettings) -> bool {
        let near_target = motion
            .value
            .iter()
            .zip(motion.target.iter())
            .all(|(x, t)| (x - t).abs() < settings.spring_position_epsilon);
        near_target
            && motion
                .velocity
                .iter()
                .all(|v| v.abs() < settings.spring_velocity_epsilon)
    }
}

impl Driver for SpringDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Spring
    }

    fn step(&mut self, motion: &mut Motion, dt: f64, settings: &SchedulerSettings) -> bool {
        if !self.spring.is_animated() {
            motion.snap_to_target();
            return true;
        }

        self.spring
            .update(&mut motion.value, &mut motion.velocity, &motion.target, dt);
        self.elapsed += dt;

        if !vector::is_finite(&motion.value) || !vector::is_finite(&motion.velocity) {
            tracing::warn!("spring produced a non-finite state, snapping to target");
            motion.snap_to_target();
            return true;
        }

        if Self::at_rest(motion, settings) || self.elapsed >= self.spring.settling_duration() {
            motion.snap_to_target();
            return true;
        }
        false
    }

    fn retarget(&mut self, _motion: &mut Motion) {
        self.elapsed = 0.0;
    }

    fn restart(&mut self, motion: &mut Motion, autoreverse: bool) {
        if autoreverse {
            std::mem::swap(&mut motion.from, &mut motion.target);
        }
        motion.value = motion.from.clone();
        motion.velocity = motion.from_velocity.clone();
        self.elapsed = 0.0;
    }
}

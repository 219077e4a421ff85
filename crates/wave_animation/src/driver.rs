//! Driver contract
//!
//! A driver advances a [`Motion`] by one frame. The spring, decay and
//! easing drivers all share this per-frame contract so the animation state
//! machine can treat them uniformly.

use wave_core::vector::{self, AnimationVector};

use crate::decay::DecayDriver;
use crate::easing::EasingDriver;
use crate::settings::SchedulerSettings;
use crate::spring::SpringDriver;

/// The kind of driver behind an animation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Spring,
    Decay,
    Easing,
}

/// Vector state shared by every driver
///
/// All vectors have the same length; [`Motion::new`] and
/// [`Motion::set_target`] zero-pad whichever side is shorter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Motion {
    pub value: AnimationVector,
    pub velocity: AnimationVector,
    pub target: AnimationVector,
    /// Value the animation started from (or was last retargeted from)
    pub from: AnimationVector,
    /// Velocity at start, restored when a decay or spring repeats
    pub from_velocity: AnimationVector,
}

impl Motion {
    /// Motion at rest at `value`, heading for `target`
    pub fn new(mut value: AnimationVector, mut target: AnimationVector) -> Self {
        vector::reconcile_lengths(&mut value, &mut target);
        let len = value.len();
        Self {
            from: value.clone(),
            value,
            velocity: vector::zeros(len),
            target,
            from_velocity: vector::zeros(len),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Replace the target, padding every vector to the longer length
    pub fn set_target(&mut self, mut target: AnimationVector) {
        vector::reconcile_lengths(&mut self.value, &mut target);
        self.target = target;
        self.pad_to(self.value.len());
    }

    /// Replace the velocity, padding or truncating it to the motion's length
    pub fn set_velocity(&mut self, mut velocity: AnimationVector) {
        if velocity.len() > self.value.len() {
            self.value.resize(velocity.len(), 0.0);
            self.pad_to(velocity.len());
        }
        velocity.resize(self.value.len(), 0.0);
        self.velocity = velocity;
    }

    /// Remember the current value and velocity as the start of the motion
    pub fn mark_start(&mut self) {
        self.from = self.value.clone();
        self.from_velocity = self.velocity.clone();
    }

    /// Jump to the target and stop moving
    pub fn snap_to_target(&mut self) {
        self.value = self.target.clone();
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
    }

    fn pad_to(&mut self, len: usize) {
        self.target.resize(len, 0.0);
        self.velocity.resize(len, 0.0);
        self.from.resize(len, 0.0);
        self.from_velocity.resize(len, 0.0);
    }
}

/// Per-frame step contract
pub trait Driver {
    fn kind(&self) -> DriverKind;

    /// Advance `motion` by `dt` seconds. Returns `true` once the driver has
    /// finished; the motion then holds its final value.
    fn step(&mut self, motion: &mut Motion, dt: f64, settings: &SchedulerSettings) -> bool;

    /// The target (or velocity) changed mid-flight. Value and velocity stay
    /// continuous; the driver restarts its completion check.
    fn retarget(&mut self, motion: &mut Motion);

    /// Start over for another repetition
    fn restart(&mut self, motion: &mut Motion, autoreverse: bool);
}

/// One of the built-in drivers
#[derive(Clone, Debug)]
pub enum AnimationDriver {
    Spring(SpringDriver),
    Decay(DecayDriver),
    Easing(EasingDriver),
}

impl AnimationDriver {
    fn as_driver_mut(&mut self) -> &mut dyn Driver {
        match self {
            AnimationDriver::Spring(driver) => driver,
            AnimationDriver::Decay(driver) => driver,
            AnimationDriver::Easing(driver) => driver,
        }
    }
}

impl Driver for AnimationDriver {
    fn kind(&self) -> DriverKind {
        match self {
            AnimationDriver::Spring(_) => DriverKind::Spring,
            AnimationDriver::Decay(_) => DriverKind::Decay,
            AnimationDriver::Easing(_) => DriverKind::Easing,
        }
    }

    fn step(&mut self, motion: &mut Motion, dt: f64, settings: &SchedulerSettings) -> bool {
        self.as_driver_mut().step(motion, dt, settings)
    }

    fn retarget(&mut self, motion: &mut Motion) {
        self.as_driver_mut().retarget(motion)
    }

    fn restart(&mut self, motion: &mut Motion, autoreverse: bool) {
        self.as_driver_mut().restart(motion, autoreverse)
    }
}

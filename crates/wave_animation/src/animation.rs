//! Animation state machine
//!
//! An [`Animation`] wraps a driver with identity, lifecycle state, the
//! from/target/velocity vectors and its callbacks. Animations live in the
//! scheduler's arena and are addressed by [`AnimationId`].

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::new_key_type;
use wave_core::vector::{self, AnimationVector};
use wave_core::Animatable;

use crate::context::{AnimationConfig, AnimationKind, GroupId};
use crate::decay::{DecayDriver, DecayFunction, DecayMode};
use crate::driver::{AnimationDriver, Driver, DriverKind, Motion};
use crate::easing::{EasingDriver, TimingFunction};
use crate::property::BindingKey;
use crate::settings::SchedulerSettings;
use crate::spring::{Spring, SpringDriver};

new_key_type! {
    /// Handle to an animation registered with a scheduler
    pub struct AnimationId;
}

/// Lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    /// Created, delayed or paused
    Inactive,
    /// Stepped every frame
    Running,
    /// Finished or stopped
    Ended,
}

/// Delivered to an animation's completion callback
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationEvent {
    /// The animation ended with this value
    Finished { at: AnimationVector },
    /// The animation was redirected before finishing
    Retargeted {
        from: AnimationVector,
        to: AnimationVector,
    },
}

impl AnimationEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, AnimationEvent::Finished { .. })
    }

    pub fn is_retargeted(&self) -> bool {
        matches!(self, AnimationEvent::Retargeted { .. })
    }
}

/// Where a stopped animation leaves its value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopPosition {
    /// Freeze at the latest integrated value
    #[default]
    Current,
    /// Return to the value the animation started from
    Start,
    /// Jump to the target
    End,
}

pub type ValueCallback = Rc<dyn Fn(&[f64])>;
pub type CompletionCallback = Rc<dyn Fn(&AnimationEvent)>;

/// Result of advancing an animation by one frame
pub(crate) struct Advance {
    /// Value to hand to the value callback
    pub value: AnimationVector,
    pub finished: bool,
}

/// A driver-backed animation
///
/// Standalone animations are built with [`Animation::spring`],
/// [`Animation::easing`] or [`Animation::decay`] and handed to
/// [`SchedulerHandle::add`](crate::SchedulerHandle::add). The property
/// animator builds its own from the active [`AnimationConfig`].
pub struct Animation {
    pub(crate) id: AnimationId,
    pub(crate) state: AnimationState,
    pub(crate) driver: AnimationDriver,
    pub(crate) motion: Motion,
    /// Component count of the value the animation ends on
    pub(crate) target_len: usize,
    pub(crate) group: Option<GroupId>,
    pub(crate) delay: f64,
    pub(crate) running_time: f64,
    pub(crate) repeats: bool,
    pub(crate) autoreverse: bool,
    pub(crate) integralize: bool,
    pub(crate) relative_priority: i32,
    pub(crate) prevents_interaction: bool,
    pub(crate) owner: Option<Weak<dyn Any>>,
    pub(crate) binding: Option<BindingKey>,
    pub(crate) value_changed: Option<ValueCallback>,
    pub(crate) completion: Option<CompletionCallback>,
}

impl Animation {
    fn with_driver(driver: AnimationDriver, motion: Motion, target_len: usize) -> Self {
        Self {
            id: AnimationId::default(),
            state: AnimationState::Inactive,
            driver,
            motion,
            target_len,
            group: None,
            delay: 0.0,
            running_time: 0.0,
            repeats: false,
            autoreverse: false,
            integralize: false,
            relative_priority: 0,
            prevents_interaction: false,
            owner: None,
            binding: None,
            value_changed: None,
            completion: None,
        }
    }

    /// Spring from `from` to `to`, starting at rest
    pub fn spring<T: Animatable>(spring: Spring, from: &T, to: &T) -> Self {
        Self::spring_vectors(spring, from.to_vector(), to.to_vector())
    }

    pub fn spring_vectors(spring: Spring, from: AnimationVector, to: AnimationVector) -> Self {
        let target_len = to.len();
        let motion = Motion::new(from, to);
        Self::with_driver(
            AnimationDriver::Spring(SpringDriver::new(spring)),
            motion,
            target_len,
        )
    }

    /// Easing from `from` to `to` over `duration` seconds
    pub fn easing<T: Animatable>(timing: TimingFunction, duration: f64, from: &T, to: &T) -> Self {
        Self::easing_vectors(timing, duration, from.to_vector(), to.to_vector())
    }

    pub fn easing_vectors(
        timing: TimingFunction,
        duration: f64,
        from: AnimationVector,
        to: AnimationVector,
    ) -> Self {
        let target_len = to.len();
        let motion = Motion::new(from, to);
        Self::with_driver(
            AnimationDriver::Easing(EasingDriver::new(timing, duration)),
            motion,
            target_len,
        )
    }

    /// Decay from `from`, thrown with `velocity`
    pub fn decay<T: Animatable>(function: DecayFunction, from: &T, velocity: &T) -> Self {
        Self::decay_vectors(function, from.to_vector(), velocity.to_vector())
    }

    pub fn decay_vectors(
        function: DecayFunction,
        from: AnimationVector,
        velocity: AnimationVector,
    ) -> Self {
        let target_len = from.len().max(velocity.len());
        let driver = DecayDriver::new(function);
        let mut motion = Motion::new(from.clone(), from);
        driver.throw(&mut motion, velocity);
        let mut animation = Self::with_driver(AnimationDriver::Decay(driver), motion, target_len);
        animation.motion.mark_start();
        animation
    }

    /// Build the animation a property write under `config` asks for.
    ///
    /// `target` is the written value; for a decay in velocity mode it is the
    /// initial velocity. Returns `None` for configs that never animate.
    pub(crate) fn from_config(
        config: &AnimationConfig,
        from: AnimationVector,
        target: AnimationVector,
        carried_velocity: Option<AnimationVector>,
    ) -> Option<Self> {
        let mut animation = match &config.kind {
            AnimationKind::Spring {
                spring,
                initial_velocity,
            } => {
                let mut animation = Self::spring_vectors(*spring, from, target);
                if let Some(velocity) = carried_velocity {
                    animation.motion.set_velocity(velocity);
                }
                if let Some(velocity) = initial_velocity {
                    animation.inject_velocity(velocity.clone());
                }
                animation
            }
            AnimationKind::Easing { timing, duration } => {
                Self::easing_vectors(*timing, *duration, from, target)
            }
            AnimationKind::Decay { rate, mode } => {
                let function = DecayFunction::new(*rate);
                match mode {
                    DecayMode::Velocity => Self::decay_vectors(function, from, target),
                    DecayMode::Value => {
                        let target_len = target.len();
                        let driver = DecayDriver::new(function);
                        let mut motion = Motion::new(from, target.clone());
                        driver.aim_at(&mut motion, target);
                        Self::with_driver(AnimationDriver::Decay(driver), motion, target_len)
                    }
                }
            }
            AnimationKind::NonAnimated | AnimationKind::VelocityUpdate => return None,
        };

        animation.motion.mark_start();
        animation.apply_flags(config);
        Some(animation)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Called with the new value every frame
    pub fn on_value_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[f64]) + 'static,
    {
        self.value_changed = Some(Rc::new(callback));
        self
    }

    /// Typed variant of [`Animation::on_value_changed`]
    pub fn on_value<T, F>(self, callback: F) -> Self
    where
        T: Animatable,
        F: Fn(T) + 'static,
    {
        self.on_value_changed(move |value| callback(T::from_vector(value)))
    }

    /// Called when the animation finishes, is stopped, or is retargeted
    pub fn on_completion<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AnimationEvent) + 'static,
    {
        self.completion = Some(Rc::new(callback));
        self
    }

    /// Seconds to wait after `start` before the first step
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        self
    }

    /// Start over instead of ending
    pub fn repeating(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    /// Play every other repetition backwards
    pub fn autoreversing(mut self, autoreverse: bool) -> Self {
        self.autoreverse = autoreverse;
        self
    }

    /// Round the final value to the display's pixel grid
    pub fn integralized(mut self, integralize: bool) -> Self {
        self.integralize = integralize;
        self
    }

    /// Higher priorities step first within a frame
    pub fn with_priority(mut self, relative_priority: i32) -> Self {
        self.relative_priority = relative_priority;
        self
    }

    pub(crate) fn apply_flags(&mut self, config: &AnimationConfig) {
        self.delay = config.delay;
        self.repeats = config.repeats;
        self.autoreverse = config.autoreverse;
        self.integralize = config.integralize_values;
        self.relative_priority = config.relative_priority;
        self.prevents_interaction = config.prevents_interaction;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn kind(&self) -> DriverKind {
        self.driver.kind()
    }

    pub fn value(&self) -> &[f64] {
        &self.motion.value
    }

    pub fn velocity(&self) -> &[f64] {
        &self.motion.velocity
    }

    pub fn target(&self) -> &[f64] {
        &self.motion.target
    }

    pub fn from_value(&self) -> &[f64] {
        &self.motion.from
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Seconds the animation has been stepped
    pub fn running_time(&self) -> f64 {
        self.running_time
    }

    pub fn relative_priority(&self) -> i32 {
        self.relative_priority
    }

    /// Linear completion of an easing animation
    pub fn fraction_complete(&self) -> Option<f64> {
        match &self.driver {
            AnimationDriver::Easing(driver) => Some(driver.fraction_complete()),
            _ => None,
        }
    }

    pub fn spring_parameters(&self) -> Option<Spring> {
        match &self.driver {
            AnimationDriver::Spring(driver) => Some(*driver.spring()),
            _ => None,
        }
    }

    pub(crate) fn owner_alive(&self) -> bool {
        self.owner
            .as_ref()
            .map_or(true, |owner| owner.strong_count() > 0)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Advance by `dt`. Repeating animations restart instead of finishing.
    pub(crate) fn advance(&mut self, dt: f64, settings: &SchedulerSettings) -> Advance {
        self.running_time += dt;
        let done = self.driver.step(&mut self.motion, dt, settings);

        if done && self.repeats {
            self.driver.restart(&mut self.motion, self.autoreverse);
            return Advance {
                value: self.motion.value.clone(),
                finished: false,
            };
        }

        if done {
            self.settle(settings);
        }
        Advance {
            value: self.motion.value.clone(),
            finished: done,
        }
    }

    /// Trim to the target's shape and apply pixel rounding
    fn settle(&mut self, settings: &SchedulerSettings) {
        if self.target_len < self.motion.len() {
            self.motion.value.truncate(self.target_len);
            self.motion.velocity.truncate(self.target_len);
            self.motion.target.truncate(self.target_len);
        }
        if self.integralize {
            vector::integralize(&mut self.motion.value, settings.display_scale);
        }
    }

    /// Redirect towards `target`. Value and velocity stay continuous.
    ///
    /// Returns the event for the completion callback when the animation was
    /// in flight.
    pub(crate) fn retarget(&mut self, target: AnimationVector) -> Option<AnimationEvent> {
        let previous = self.motion.target.clone();
        self.target_len = target.len();

        match &mut self.driver {
            AnimationDriver::Decay(driver) => driver.aim_at(&mut self.motion, target),
            driver => {
                self.motion.set_target(target);
                driver.retarget(&mut self.motion);
            }
        }

        (self.state == AnimationState::Running).then(|| AnimationEvent::Retargeted {
            from: previous,
            to: self.motion.target.clone(),
        })
    }

    /// Replace the velocity without restarting elapsed time. Non-finite
    /// velocities are zeroed.
    pub(crate) fn set_velocity(&mut self, mut velocity: AnimationVector) {
        if !vector::is_finite(&velocity) {
            tracing::warn!("ignoring non-finite velocity, using zero");
            velocity.iter_mut().for_each(|v| *v = 0.0);
        }

        match &mut self.driver {
            AnimationDriver::Decay(driver) => driver.throw(&mut self.motion, velocity),
            AnimationDriver::Spring(_) => self.motion.set_velocity(velocity),
            AnimationDriver::Easing(_) => {
                tracing::debug!("easing velocity is derived from its curve, ignoring update");
            }
        }
    }

    /// Apply an initial velocity to the leading components
    pub(crate) fn inject_velocity(&mut self, mut velocity: AnimationVector) {
        velocity.truncate(self.motion.len());
        let mut full = vector::zeros(self.motion.len());
        full[..velocity.len()].copy_from_slice(&velocity);
        self.set_velocity(full);
    }

    /// Swap the driver parameters for those in `config`, keeping state
    pub(crate) fn reconfigure(&mut self, config: &AnimationConfig) {
        match (&mut self.driver, &config.kind) {
            (AnimationDriver::Spring(driver), AnimationKind::Spring { spring, .. }) => {
                driver.set_spring(*spring);
            }
            (AnimationDriver::Easing(driver), AnimationKind::Easing { timing, duration }) => {
                driver.reconfigure(*timing, *duration);
            }
            (AnimationDriver::Decay(driver), AnimationKind::Decay { rate, .. }) => {
                driver.set_function(DecayFunction::new(*rate));
            }
            _ => {}
        }
        self.apply_flags(config);
    }

    /// Scrub an easing animation. Returns `false` for other drivers.
    pub(crate) fn scrub(&mut self, fraction: f64) -> bool {
        match &mut self.driver {
            AnimationDriver::Easing(driver) => {
                driver.scrub(&mut self.motion, fraction);
                true
            }
            _ => false,
        }
    }

    /// Move the value for an immediate stop
    pub(crate) fn jump_to(&mut self, position: StopPosition) {
        match position {
            StopPosition::Current => {}
            StopPosition::Start => self.motion.value = self.motion.from.clone(),
            StopPosition::End => self.motion.value = self.motion.target.clone(),
        }
        self.motion.velocity.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Target for a non-immediate stop at `position`
    pub(crate) fn stop_target(&self, position: StopPosition) -> AnimationVector {
        match position {
            StopPosition::Current => self.motion.value.clone(),
            StopPosition::Start => self.motion.from.clone(),
            StopPosition::End => self.motion.target.clone(),
        }
    }

    /// Rewind a finished animation so it can run again
    pub(crate) fn rewind(&mut self) {
        self.motion.value = self.motion.from.clone();
        self.motion.velocity = self.motion.from_velocity.clone();
        self.driver.restart(&mut self.motion, false);
        self.running_time = 0.0;
    }

    pub(crate) fn info(&self) -> AnimationInfo {
        AnimationInfo {
            id: self.id,
            kind: self.kind(),
            state: self.state,
            value: self.motion.value.clone(),
            velocity: self.motion.velocity.clone(),
            target: self.motion.target.clone(),
            group: self.group,
            fraction_complete: self.fraction_complete(),
        }
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("value", &self.motion.value)
            .field("velocity", &self.motion.velocity)
            .field("target", &self.motion.target)
            .field("group", &self.group)
            .field("running_time", &self.running_time)
            .finish()
    }
}

/// A snapshot of an animation, detached from the scheduler
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationInfo {
    pub id: AnimationId,
    pub kind: DriverKind,
    pub state: AnimationState,
    pub value: AnimationVector,
    pub velocity: AnimationVector,
    pub target: AnimationVector,
    pub group: Option<GroupId>,
    pub fraction_complete: Option<f64>,
}

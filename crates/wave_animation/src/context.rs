//! Animation context
//!
//! Configurations describing how property writes are animated, and the
//! scope guard that keeps one on the scheduler's context stack.
//!
//! # Example
//!
//! ```rust
//! use wave_animation::{AnimationConfig, Scheduler, Spring};
//!
//! let scheduler = Scheduler::new();
//! {
//!     let _scope = scheduler.begin(AnimationConfig::spring(Spring::snappy()));
//!     assert!(scheduler.current_config().is_some());
//!     // property writes here animate with the snappy spring
//! }
//! assert!(scheduler.current_config().is_none());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use wave_core::vector::{self, AnimationVector};
use wave_core::{Result, WaveError};

use crate::decay::{DecayFunction, DecayMode, NORMAL_DECELERATION_RATE};
use crate::driver::DriverKind;
use crate::easing::TimingFunction;
use crate::scheduler::SchedulerHandle;
use crate::spring::Spring;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the animations created under one scope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    /// A fresh, process-unique group id
    pub fn next() -> Self {
        GroupId(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Which driver a scope applies to property writes
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationKind {
    Spring {
        spring: Spring,
        /// Starting velocity for the leading components (e.g. the release
        /// velocity of a drag)
        initial_velocity: Option<AnimationVector>,
    },
    Easing {
        timing: TimingFunction,
        duration: f64,
    },
    Decay {
        rate: f64,
        mode: DecayMode,
    },
    /// Writes apply synchronously and stop any running animation
    NonAnimated,
    /// Writes update the velocity of running animations, reads return it
    VelocityUpdate,
}

impl AnimationKind {
    /// The driver this kind creates, if it creates one
    pub fn driver_kind(&self) -> Option<DriverKind> {
        match self {
            AnimationKind::Spring { .. } => Some(DriverKind::Spring),
            AnimationKind::Easing { .. } => Some(DriverKind::Easing),
            AnimationKind::Decay { .. } => Some(DriverKind::Decay),
            AnimationKind::NonAnimated | AnimationKind::VelocityUpdate => None,
        }
    }
}

/// One frame of the animation context stack
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationConfig {
    pub kind: AnimationKind,
    /// Seconds before animations created under this config start
    pub delay: f64,
    pub group: GroupId,
    /// Block interaction with animated objects until their animations end
    pub prevents_interaction: bool,
    pub repeats: bool,
    pub autoreverse: bool,
    /// Round final values to the display's pixel grid
    pub integralize_values: bool,
    pub relative_priority: i32,
}

impl AnimationConfig {
    /// A config of `kind` with a fresh group and default flags
    pub fn new(kind: AnimationKind) -> Self {
        Self {
            kind,
            delay: 0.0,
            group: GroupId::next(),
            prevents_interaction: false,
            repeats: false,
            autoreverse: false,
            integralize_values: false,
            relative_priority: 0,
        }
    }

    pub fn spring(spring: Spring) -> Self {
        Self::new(AnimationKind::Spring {
            spring,
            initial_velocity: None,
        })
    }

    pub fn easing(timing: TimingFunction, duration: f64) -> Self {
        Self::new(AnimationKind::Easing { timing, duration })
    }

    /// Decay where written values are initial velocities
    pub fn decay(rate: f64) -> Self {
        Self::new(AnimationKind::Decay {
            rate,
            mode: DecayMode::Velocity,
        })
    }

    /// Decay where written values are resting points
    pub fn decay_to(rate: f64) -> Self {
        Self::new(AnimationKind::Decay {
            rate,
            mode: DecayMode::Value,
        })
    }

    pub fn non_animated() -> Self {
        Self::new(AnimationKind::NonAnimated)
    }

    pub fn velocity_update() -> Self {
        Self::new(AnimationKind::VelocityUpdate)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Only meaningful for spring configs
    pub fn with_initial_velocity(mut self, velocity: AnimationVector) -> Self {
        if let AnimationKind::Spring {
            initial_velocity, ..
        } = &mut self.kind
        {
            *initial_velocity = Some(velocity);
        }
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Share a group with another config
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = group;
        self
    }

    pub fn preventing_interaction(mut self, prevents_interaction: bool) -> Self {
        self.prevents_interaction = prevents_interaction;
        self
    }

    pub fn repeating(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn autoreversing(mut self, autoreverse: bool) -> Self {
        self.autoreverse = autoreverse;
        self
    }

    pub fn integralized(mut self, integralize_values: bool) -> Self {
        self.integralize_values = integralize_values;
        self
    }

    pub fn with_priority(mut self, relative_priority: i32) -> Self {
        self.relative_priority = relative_priority;
        self
    }

    /// Whether writes under this config are applied synchronously
    pub fn is_non_animated(&self) -> bool {
        matches!(self.kind, AnimationKind::NonAnimated)
    }

    /// Check the parameters can drive an animation
    pub fn validate(&self) -> Result<()> {
        if !self.delay.is_finite() {
            return Err(WaveError::NonFinite("delay"));
        }
        if self.delay < 0.0 {
            return Err(WaveError::InvalidSetting(format!(
                "delay must not be negative, got {}",
                self.delay
            )));
        }

        match &self.kind {
            AnimationKind::Spring {
                spring,
                initial_velocity,
            } => {
                Spring::try_new(spring.damping_ratio(), spring.response())?;
                if initial_velocity
                    .as_ref()
                    .is_some_and(|velocity| !vector::is_finite(velocity))
                {
                    return Err(WaveError::NonFinite("initial velocity"));
                }
            }
            AnimationKind::Easing { duration, .. } => {
                if !duration.is_finite() || *duration <= 0.0 {
                    return Err(WaveError::InvalidDuration(*duration));
                }
            }
            AnimationKind::Decay { rate, .. } => {
                DecayFunction::try_new(*rate)?;
            }
            AnimationKind::NonAnimated | AnimationKind::VelocityUpdate => {}
        }
        Ok(())
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::spring(Spring::default())
    }
}

impl From<Spring> for AnimationConfig {
    fn from(spring: Spring) -> Self {
        Self::spring(spring)
    }
}

impl From<DecayFunction> for AnimationConfig {
    fn from(function: DecayFunction) -> Self {
        Self::decay(function.rate())
    }
}

/// Decay config at the normal scroll-view deceleration rate
pub fn normal_decay() -> AnimationConfig {
    AnimationConfig::decay(NORMAL_DECELERATION_RATE)
}

/// Keeps a config on the context stack until dropped
///
/// Returned by [`SchedulerHandle::begin`]. Dropping the guard pops its
/// frame (and any frames opened after it that are still open) and closes
/// the frame's group, so a group with no animations finishes right away.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct AnimationScope {
    handle: SchedulerHandle,
    token: u64,
    group: GroupId,
}

impl AnimationScope {
    pub(crate) fn new(handle: SchedulerHandle, token: u64, group: GroupId) -> Self {
        Self {
            handle,
            token,
            group,
        }
    }

    /// Group shared by animations created in this scope
    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl Drop for AnimationScope {
    fn drop(&mut self) {
        self.handle.end_scope(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_group_ids_are_unique() {
        let a = AnimationConfig::spring(Spring::smooth());
        let b = AnimationConfig::spring(Spring::smooth());
        assert_ne!(a.group, b.group);

        let shared = b.clone().with_group(a.group);
        assert_eq!(shared.group, a.group);
    }

    #[test]
    fn test_validate() {
        assert!(AnimationConfig::spring(Spring::snappy()).validate().is_ok());
        assert!(AnimationConfig::non_animated().validate().is_ok());

        assert_eq!(
            AnimationConfig::easing(TimingFunction::linear(), 0.0).validate(),
            Err(WaveError::InvalidDuration(0.0))
        );
        assert_eq!(
            AnimationConfig::decay(1.5).validate(),
            Err(WaveError::InvalidDecayRate(1.5))
        );
        assert!(AnimationConfig::spring(Spring::new(-1.0, 0.5))
            .validate()
            .is_err());
        assert_eq!(
            AnimationConfig::spring(Spring::smooth())
                .with_delay(f64::INFINITY)
                .validate(),
            Err(WaveError::NonFinite("delay"))
        );
        assert_eq!(
            AnimationConfig::spring(Spring::smooth())
                .with_initial_velocity(smallvec![f64::NAN])
                .validate(),
            Err(WaveError::NonFinite("initial velocity"))
        );
    }

    #[test]
    fn test_initial_velocity_only_for_springs() {
        let config = AnimationConfig::easing(TimingFunction::linear(), 1.0)
            .with_initial_velocity(smallvec![1.0]);
        assert_eq!(
            config.kind,
            AnimationKind::Easing {
                timing: TimingFunction::linear(),
                duration: 1.0
            }
        );
    }

    #[test]
    fn test_driver_kind() {
        assert_eq!(
            normal_decay().kind.driver_kind(),
            Some(DriverKind::Decay)
        );
        assert_eq!(AnimationConfig::velocity_update().kind.driver_kind(), None);
    }
}

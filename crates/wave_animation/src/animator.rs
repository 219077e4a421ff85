//! Property animator
//!
//! The write path for host objects. A [`PropertyAnimator`] wraps a shared
//! host object and turns property writes into animations according to the
//! scheduler's current context:
//!
//! - no scope, or a non-animated scope: the write applies synchronously and
//!   stops any animation of the property
//! - a velocity-update scope: the write replaces the running animation's
//!   velocity
//! - an animated scope: the write creates, retargets or replaces the
//!   property's animation
//!
//! Reads return the model value: the target while an animation runs.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wave_core::vector;
use wave_core::Animatable;

use crate::animation::{AnimationId, AnimationInfo, StopPosition, ValueCallback};
use crate::context::AnimationKind;
use crate::decay::DecayMode;
use crate::property::{BindingKey, Property};
use crate::scheduler::{shared_scheduler, PropertyWrite, SchedulerHandle};

/// Animates the properties of one host object
///
/// Holds the object weakly. Once it is dropped, reads return `None`, writes
/// are ignored, and its animations are pruned on the next frame.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use wave_animation::{AnimationConfig, Property, PropertyAnimator, Scheduler, Spring};
///
/// struct Layer {
///     opacity: f64,
/// }
///
/// const OPACITY: Property<Layer, f64> =
///     Property::new("opacity", |layer| layer.opacity, |layer, value| layer.opacity = value);
///
/// let scheduler = Scheduler::new();
/// let layer = Rc::new(RefCell::new(Layer { opacity: 1.0 }));
/// let animator = PropertyAnimator::new(&layer, scheduler.handle());
///
/// scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
///     animator.set(&OPACITY, 0.0);
/// });
/// assert_eq!(animator.get(&OPACITY), Some(0.0));
/// assert_eq!(layer.borrow().opacity, 1.0);
///
/// while scheduler.tick(1.0 / 60.0) {}
/// assert_eq!(layer.borrow().opacity, 0.0);
/// ```
pub struct PropertyAnimator<O: 'static> {
    object: Weak<RefCell<O>>,
    scheduler: SchedulerHandle,
}

impl<O: 'static> Clone for PropertyAnimator<O> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<O: 'static> PropertyAnimator<O> {
    pub fn new(object: &Rc<RefCell<O>>, scheduler: SchedulerHandle) -> Self {
        Self {
            object: Rc::downgrade(object),
            scheduler,
        }
    }

    /// Animator on the thread's shared scheduler
    pub fn shared(object: &Rc<RefCell<O>>) -> Self {
        Self::new(object, shared_scheduler())
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Check if the object is still alive
    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }

    fn identity(&self) -> usize {
        self.object.as_ptr() as *const () as usize
    }

    fn binding<T>(&self, property: &Property<O, T>) -> BindingKey {
        BindingKey::new(self.identity(), property.key())
    }

    /// The value currently stored on the object
    pub fn presentation<T>(&self, property: &Property<O, T>) -> Option<T> {
        let object = self.object.upgrade()?;
        let object = object.try_borrow().ok()?;
        Some(property.read(&object))
    }

    // =========================================================================
    // Read / Write
    // =========================================================================

    /// Read a property.
    ///
    /// Returns the animation's target while one runs, the velocity inside
    /// a velocity-update scope, and the stored value otherwise.
    pub fn get<T: Animatable>(&self, property: &Property<O, T>) -> Option<T> {
        if !self.is_alive() {
            return None;
        }
        if matches!(
            self.scheduler.current_config().map(|config| config.kind),
            Some(AnimationKind::VelocityUpdate)
        ) {
            return Some(self.velocity(property).unwrap_or_else(T::zero));
        }
        match self.scheduler.binding_info(self.binding(property)) {
            Some(info) => Some(T::from_vector(&info.target)),
            None => self.presentation(property),
        }
    }

    /// Write a property under the scheduler's current context
    pub fn set<T: Animatable>(&self, property: &Property<O, T>, value: T) {
        let Some(object) = self.object.upgrade() else {
            tracing::debug!(property = %property.key(), "write to a dropped object ignored");
            return;
        };
        let binding = self.binding(property);

        let config = match self.scheduler.current_config() {
            Some(config) if !config.is_non_animated() => config,
            _ => {
                self.write_now(property, binding, value);
                return;
            }
        };

        if matches!(config.kind, AnimationKind::VelocityUpdate) {
            if !self
                .scheduler
                .set_binding_velocity(binding, value.to_vector())
            {
                tracing::debug!(property = %property.key(), "no animation to update velocity of");
            }
            return;
        }

        let Some(live) = self.presentation(property) else {
            tracing::warn!(property = %property.key(), "object is borrowed, write ignored");
            return;
        };
        let existing = self.scheduler.binding_info(binding);
        let throws = matches!(
            config.kind,
            AnimationKind::Decay {
                mode: DecayMode::Velocity,
                ..
            }
        );

        // Writing the value the property is already headed to is a no-op
        if !throws {
            let same_driver = existing
                .as_ref()
                .map_or(true, |info| config.kind.driver_kind() == Some(info.kind));
            let effective = existing
                .as_ref()
                .map_or_else(|| live.clone(), |info| T::from_vector(&info.target));
            if same_driver && effective == value {
                tracing::trace!(property = %property.key(), "write matches current value");
                return;
            }
        }

        let mut from = live;
        let mut target = value;
        if !throws {
            T::reconcile(&mut from, &mut target);
        }
        let target_vector = target.to_vector();
        if !vector::is_finite(&target_vector) {
            tracing::warn!(property = %property.key(), "non-finite target, applying without animation");
            self.write_now(property, binding, target);
            return;
        }

        let owner: Rc<dyn Any> = object;
        let write = PropertyWrite {
            binding,
            owner: Rc::downgrade(&owner),
            config,
            from: from.to_vector(),
            target: target_vector,
            sink: self.sink(property),
        };
        drop(owner);

        if self.scheduler.submit(write).is_none() && !self.scheduler.is_alive() {
            tracing::warn!(property = %property.key(), "scheduler dropped, applying without animation");
            self.write_now(property, binding, target);
        }
    }

    /// Stop any animation of the property and store `value` now
    fn write_now<T>(&self, property: &Property<O, T>, binding: BindingKey, value: T) {
        self.scheduler
            .stop_binding(binding, StopPosition::Current, true);
        let Some(object) = self.object.upgrade() else {
            return;
        };
        match object.try_borrow_mut() {
            Ok(mut object) => property.write(&mut object, value),
            Err(_) => tracing::warn!(property = %property.key(), "object is borrowed, write dropped"),
        };
    }

    /// Frame callback storing animated values on the object
    fn sink<T: Animatable>(&self, property: &Property<O, T>) -> ValueCallback {
        let object = self.object.clone();
        let key = property.key();
        let setter = property.setter();
        Rc::new(move |value: &[f64]| {
            let Some(object) = object.upgrade() else {
                return;
            };
            let Ok(mut object) = object.try_borrow_mut() else {
                tracing::warn!(property = %key, "object is borrowed, frame dropped");
                return;
            };
            setter(&mut object, T::from_vector(value));
        })
    }

    // =========================================================================
    // Animation State
    // =========================================================================

    /// Velocity of the property's animation
    pub fn velocity<T: Animatable>(&self, property: &Property<O, T>) -> Option<T> {
        self.scheduler
            .binding_info(self.binding(property))
            .map(|info| T::from_vector(&info.velocity))
    }

    /// Replace the running animation's velocity. Returns `false` when the
    /// property is not animating.
    pub fn set_velocity<T: Animatable>(&self, property: &Property<O, T>, velocity: T) -> bool {
        self.scheduler
            .set_binding_velocity(self.binding(property), velocity.to_vector())
    }

    /// Snapshot of the property's animation
    pub fn animation<T>(&self, property: &Property<O, T>) -> Option<AnimationInfo> {
        self.scheduler.binding_info(self.binding(property))
    }

    pub fn animation_id<T>(&self, property: &Property<O, T>) -> Option<AnimationId> {
        self.animation(property).map(|info| info.id)
    }

    pub fn is_animating<T>(&self, property: &Property<O, T>) -> bool {
        self.animation(property).is_some()
    }

    /// Stop the property's animation
    pub fn stop<T>(&self, property: &Property<O, T>, position: StopPosition, immediately: bool) {
        self.scheduler
            .stop_binding(self.binding(property), position, immediately);
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Whether an interaction-blocking animation is running on the object
    pub fn is_interaction_blocked(&self) -> bool {
        self.scheduler.is_object_blocked(self.identity())
    }

    /// Called with `false` when the first blocking animation starts and
    /// `true` when the last one ends
    pub fn on_interaction_changed<F: Fn(bool) + 'static>(&self, listener: F) {
        self.scheduler
            .add_interaction_listener(self.identity(), Rc::new(listener));
    }

    /// Drop every interaction listener registered for the object
    pub fn clear_interaction_listeners(&self) {
        self.scheduler
            .remove_interaction_listeners(self.identity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnimationConfig;
    use crate::driver::DriverKind;
    use crate::easing::TimingFunction;
    use crate::scheduler::Scheduler;
    use crate::spring::Spring;
    use std::cell::Cell;
    use wave_core::{Point, Rgba};

    #[derive(Debug, Default)]
    struct Host {
        x: f64,
        position: Point,
        tint: Rgba,
    }

    const X: Property<Host, f64> = Property::new("x", |h| h.x, |h, v| h.x = v);
    const POSITION: Property<Host, Point> =
        Property::new("position", |h| h.position, |h, v| h.position = v);
    const TINT: Property<Host, Rgba> = Property::new("tint", |h| h.tint, |h, v| h.tint = v);

    fn setup() -> (Scheduler, Rc<RefCell<Host>>, PropertyAnimator<Host>) {
        let scheduler = Scheduler::new();
        let host = Rc::new(RefCell::new(Host::default()));
        let animator = PropertyAnimator::new(&host, scheduler.handle());
        (scheduler, host, animator)
    }

    fn run(scheduler: &Scheduler) {
        let mut frames = 0;
        while scheduler.tick(1.0 / 60.0) {
            frames += 1;
            assert!(frames < 10_000, "animation never settled");
        }
    }

    #[test]
    fn test_write_outside_scope_is_synchronous() {
        let (scheduler, host, animator) = setup();
        animator.set(&X, 12.0);
        assert_eq!(host.borrow().x, 12.0);
        assert_eq!(scheduler.animation_count(), 0);
    }

    #[test]
    fn test_animated_write_reports_target() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::spring(Spring::snappy()), || {
            animator.set(&POSITION, Point::new(10.0, 20.0));
        });

        assert_eq!(animator.get(&POSITION), Some(Point::new(10.0, 20.0)));
        assert_eq!(animator.presentation(&POSITION), Some(Point::ZERO));
        assert!(animator.is_animating(&POSITION));

        run(&scheduler);
        assert_eq!(host.borrow().position, Point::new(10.0, 20.0));
        assert!(!animator.is_animating(&POSITION));
        assert_eq!(scheduler.animation_count(), 0);
    }

    #[test]
    fn test_non_animated_write_stops_animation() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
            animator.set(&X, 100.0);
        });
        scheduler.tick(0.05);

        scheduler.non_animate(|| animator.set(&X, 5.0));
        assert_eq!(host.borrow().x, 5.0);
        assert!(!animator.is_animating(&X));

        scheduler.tick(0.05);
        assert_eq!(host.borrow().x, 5.0);
    }

    #[test]
    fn test_velocity_update_scope() {
        let (scheduler, _host, animator) = setup();
        scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
            animator.set(&X, 100.0);
        });

        scheduler.animate(AnimationConfig::velocity_update(), || {
            animator.set(&X, 42.0);
            assert_eq!(animator.get(&X), Some(42.0));
        });
        assert_eq!(animator.velocity(&X), Some(42.0));
        assert_eq!(animator.get(&X), Some(100.0));
    }

    #[test]
    fn test_velocity_update_without_animation_is_ignored() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::velocity_update(), || {
            animator.set(&X, 3.0);
        });
        assert_eq!(host.borrow().x, 0.0);
        assert!(!animator.set_velocity(&X, 1.0));
    }

    #[test]
    fn test_decay_velocity_mode_throws() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::decay(0.998), || {
            animator.set(&X, 1000.0);
        });
        let destination = animator.get(&X).unwrap();
        assert!(destination > 0.0);

        run(&scheduler);
        let x = host.borrow().x;
        assert!((x - destination).abs() < 1.0);
    }

    #[test]
    fn test_invisible_color_reconciled() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::easing(TimingFunction::linear(), 1.0), || {
            animator.set(&TINT, Rgba::RED);
        });
        scheduler.tick(0.5);

        let tint = host.borrow().tint;
        assert_eq!((tint.red, tint.green, tint.blue), (1.0, 0.0, 0.0));
        assert!((tint.alpha - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_target_applies_directly() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
            animator.set(&X, f64::INFINITY);
        });
        assert_eq!(host.borrow().x, f64::INFINITY);
        assert_eq!(scheduler.animation_count(), 0);
    }

    #[test]
    fn test_kind_change_carries_value() {
        let (scheduler, host, animator) = setup();
        scheduler.animate(AnimationConfig::easing(TimingFunction::linear(), 1.0), || {
            animator.set(&X, 10.0);
        });
        scheduler.tick(0.5);
        let first = animator.animation_id(&X).unwrap();

        scheduler.animate(AnimationConfig::spring(Spring::snappy()), || {
            animator.set(&X, 20.0);
        });
        let info = animator.animation(&X).unwrap();
        assert_ne!(info.id, first);
        assert_eq!(info.kind, DriverKind::Spring);
        assert_eq!(info.value.as_slice(), &[5.0]);
        assert!(vector::approx_eq(&info.velocity, &[10.0], 1e-6));

        run(&scheduler);
        assert_eq!(host.borrow().x, 20.0);
    }

    #[test]
    fn test_interaction_blocking() {
        let (scheduler, _host, animator) = setup();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let log = changes.clone();
        animator.on_interaction_changed(move |enabled| log.borrow_mut().push(enabled));

        scheduler.animate(
            AnimationConfig::spring(Spring::snappy()).preventing_interaction(true),
            || {
                animator.set(&X, 1.0);
                animator.set(&POSITION, Point::new(1.0, 1.0));
            },
        );
        assert!(animator.is_interaction_blocked());

        run(&scheduler);
        assert!(!animator.is_interaction_blocked());
        assert_eq!(changes.borrow().as_slice(), &[false, true]);
    }

    #[test]
    fn test_dropped_object() {
        let (scheduler, host, animator) = setup();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        scheduler.animate_with_completion(
            AnimationConfig::spring(Spring::smooth()),
            || animator.set(&X, 50.0),
            move |outcome| {
                assert!(outcome.stopped);
                flag.set(true);
            },
        );

        drop(host);
        assert_eq!(animator.get(&X), None);
        assert!(!scheduler.tick(1.0 / 60.0));
        assert!(fired.get());
        assert_eq!(scheduler.animation_count(), 0);
    }
}

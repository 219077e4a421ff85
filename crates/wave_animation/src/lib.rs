//! Wave Animation
//!
//! Continuous, interruptible property animation driven by a frame scheduler.
//!
//! # Features
//!
//! - **Springs**: damping ratio / response parameterisation, substepped
//!   semi-implicit Euler integration, velocity preserved across retargets
//! - **Decay**: scroll-view style deceleration towards a projected resting point
//! - **Easing**: cubic bezier timing curves with scrubbing and autoreverse
//! - **Context stack**: nested scopes decide how property writes animate
//! - **Groups**: one completion per scope, fired after its last animation ends
//! - **Interaction blocking**: per-object tracking of blocking animations
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use wave_animation::{AnimationConfig, Property, PropertyAnimator, Scheduler, Spring};
//! use wave_core::Point;
//!
//! struct Card {
//!     center: Point,
//! }
//!
//! const CENTER: Property<Card, Point> =
//!     Property::new("center", |card| card.center, |card, value| card.center = value);
//!
//! let scheduler = Scheduler::new();
//! let card = Rc::new(RefCell::new(Card { center: Point::ZERO }));
//! let animator = PropertyAnimator::new(&card, scheduler.handle());
//!
//! scheduler.animate(AnimationConfig::spring(Spring::bouncy()), || {
//!     animator.set(&CENTER, Point::new(120.0, 80.0));
//! });
//!
//! while scheduler.tick(1.0 / 60.0) {}
//! assert_eq!(card.borrow().center, Point::new(120.0, 80.0));
//! ```

pub mod animation;
pub mod animator;
pub mod context;
pub mod decay;
pub mod driver;
pub mod easing;
pub mod group;
pub mod property;
pub mod scheduler;
pub mod settings;
pub mod spring;

pub use animation::{
    Animation, AnimationEvent, AnimationId, AnimationInfo, AnimationState, CompletionCallback,
    StopPosition, ValueCallback,
};
pub use animator::PropertyAnimator;
pub use context::{normal_decay, AnimationConfig, AnimationKind, AnimationScope, GroupId};
pub use decay::{
    DecayDriver, DecayFunction, DecayMode, FAST_DECELERATION_RATE, NORMAL_DECELERATION_RATE,
};
pub use driver::{AnimationDriver, Driver, DriverKind, Motion};
pub use easing::{EasingDriver, TimingFunction};
pub use group::{GroupHandler, GroupOutcome};
pub use property::{BindingKey, Property, PropertyKey};
pub use scheduler::{
    animate, non_animate, shared_scheduler, FrameClock, InteractionListener, Scheduler,
    SchedulerHandle,
};
pub use settings::SchedulerSettings;
pub use spring::{Spring, SpringDriver};

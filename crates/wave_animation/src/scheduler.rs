//! Frame scheduler
//!
//! Owns every registered animation and advances them once per frame.
//! The scheduler is single-threaded: all state sits behind one `RefCell`,
//! and every public entry point borrows it only for the duration of the
//! bookkeeping. Callbacks (value sinks, completions, group handlers, frame
//! clock hooks) are collected while borrowed and run after the borrow is
//! released, so they may freely call back into the scheduler.
//!
//! Within a frame every running animation is stepped before any value
//! callback runs, in descending `relative_priority` and registration order.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::time::Instant;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use wave_core::vector::AnimationVector;
use wave_core::{Animatable, Result};

use crate::animation::{
    Animation, AnimationEvent, AnimationId, AnimationInfo, AnimationState, CompletionCallback,
    StopPosition, ValueCallback,
};
use crate::context::{AnimationConfig, AnimationKind, AnimationScope, GroupId};
use crate::decay::DecayMode;
use crate::group::{CompletedGroup, Departure, GroupHandler, GroupOutcome, Groups};
use crate::property::BindingKey;
use crate::settings::SchedulerSettings;

// ============================================================================
// Shared Scheduler
// ============================================================================

thread_local! {
    static SHARED_SCHEDULER: Scheduler = Scheduler::new();
}

/// The scheduler shared by everything on the current thread
///
/// Created on first use. Hosts with one UI thread can use this instead of
/// passing a handle around.
pub fn shared_scheduler() -> SchedulerHandle {
    SHARED_SCHEDULER.with(|scheduler| scheduler.handle())
}

/// Run `writes` with `config` on the shared scheduler's context stack
pub fn animate<F: FnOnce()>(config: AnimationConfig, writes: F) -> GroupId {
    shared_scheduler().animate(config, writes)
}

/// Run `writes` synchronously on the shared scheduler, bypassing any
/// enclosing animated scope
pub fn non_animate<F: FnOnce()>(writes: F) {
    shared_scheduler().non_animate(writes)
}

// ============================================================================
// Frame Clock
// ============================================================================

/// Host display link or timer driving [`SchedulerHandle::tick_now`]
///
/// The scheduler resumes the clock when the first animation registers and
/// pauses it once nothing is left to animate.
pub trait FrameClock {
    fn resume(&self);
    fn pause(&self);
}

pub type InteractionListener = Rc<dyn Fn(bool)>;

/// Deferred side effect, run after the scheduler borrow is released
enum Effect {
    Value(ValueCallback, AnimationVector),
    Completion(CompletionCallback, AnimationEvent),
    Group(GroupHandler, GroupOutcome),
    Interaction(InteractionListener, bool),
    Clock(Rc<dyn FrameClock>, bool),
}

fn flush(effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Value(callback, value) => callback(&value),
            Effect::Completion(callback, event) => callback(&event),
            Effect::Group(handler, outcome) => handler(outcome),
            Effect::Interaction(listener, enabled) => listener(enabled),
            Effect::Clock(clock, true) => clock.resume(),
            Effect::Clock(clock, false) => clock.pause(),
        }
    }
}

/// A property write the animator wants turned into an animation
pub(crate) struct PropertyWrite {
    pub binding: BindingKey,
    pub owner: Weak<dyn Any>,
    pub config: AnimationConfig,
    pub from: AnimationVector,
    pub target: AnimationVector,
    pub sink: ValueCallback,
}

/// An open scope. `token` tells a live frame from a stale guard.
struct ScopeFrame {
    token: u64,
    config: AnimationConfig,
}

struct PendingStart {
    id: AnimationId,
    remaining: f64,
}

#[derive(Default)]
struct Interaction {
    /// Animation -> object it blocks
    holders: FxHashMap<AnimationId, usize>,
    /// Object -> number of blocking animations
    blocked: FxHashMap<usize, usize>,
    listeners: FxHashMap<usize, Vec<InteractionListener>>,
}

/// Internal state of the scheduler
struct SchedulerInner {
    animations: SlotMap<AnimationId, Animation>,
    /// Registration order
    running: IndexSet<AnimationId>,
    pending: Vec<PendingStart>,
    bindings: FxHashMap<BindingKey, AnimationId>,
    groups: Groups,
    scopes: Vec<ScopeFrame>,
    next_scope: u64,
    settings: SchedulerSettings,
    clock: Option<Rc<dyn FrameClock>>,
    clock_running: bool,
    last_frame: Option<Instant>,
    ticking: bool,
    frame: u64,
    interaction: Interaction,
}

impl SchedulerInner {
    fn new(settings: SchedulerSettings) -> Self {
        Self {
            animations: SlotMap::with_key(),
            running: IndexSet::new(),
            pending: Vec::new(),
            bindings: FxHashMap::default(),
            groups: Groups::default(),
            scopes: Vec::new(),
            next_scope: 0,
            settings,
            clock: None,
            clock_running: false,
            last_frame: None,
            ticking: false,
            frame: 0,
            interaction: Interaction::default(),
        }
    }

    fn is_active(&self) -> bool {
        !self.running.is_empty() || !self.pending.is_empty()
    }

    fn insert(&mut self, animation: Animation) -> AnimationId {
        self.animations.insert_with_key(|id| {
            let mut animation = animation;
            animation.id = id;
            animation
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start now, or after the animation's delay
    fn schedule(&mut self, id: AnimationId, fx: &mut Vec<Effect>) {
        let Some(animation) = self.animations.get(id) else {
            return;
        };
        if animation.delay > 0.0 {
            tracing::debug!(?id, delay = animation.delay, "animation delayed");
            self.pending.push(PendingStart {
                id,
                remaining: animation.delay,
            });
            self.wake(fx);
        } else {
            self.start_now(id, fx);
        }
    }

    fn start_now(&mut self, id: AnimationId, fx: &mut Vec<Effect>) {
        let Some(animation) = self.animations.get_mut(id) else {
            return;
        };
        animation.state = AnimationState::Running;
        let blocks = animation
            .binding
            .filter(|_| animation.prevents_interaction)
            .map(|binding| binding.object);

        tracing::debug!(?id, kind = ?animation.kind(), "animation started");
        self.running.insert(id);
        if let Some(object) = blocks {
            self.block(id, object, fx);
        }
        self.wake(fx);
    }

    /// End an animation, reporting `event` to its completion callback.
    /// Animations bound to a property are removed from the arena.
    fn end(
        &mut self,
        id: AnimationId,
        event: Option<AnimationEvent>,
        departure: Departure,
        fx: &mut Vec<Effect>,
    ) {
        let Some(animation) = self.animations.get_mut(id) else {
            return;
        };
        animation.state = AnimationState::Ended;
        let group = animation.group.take();
        let binding = animation.binding;
        if let (Some(event), Some(callback)) = (event, animation.completion.clone()) {
            fx.push(Effect::Completion(callback, event));
        }

        self.running.shift_remove(&id);
        self.pending.retain(|pending| pending.id != id);
        self.unblock(id, fx);

        if let Some(group) = group {
            if let Some(completed) = self.groups.leave(group, id, departure) {
                self.complete_group(completed, fx);
            }
        }
        if let Some(binding) = binding {
            self.release_binding(binding, id);
            self.animations.remove(id);
        }
    }

    /// Drop an animation without reporting to its completion callback
    fn discard(&mut self, id: AnimationId, fx: &mut Vec<Effect>) -> Option<Animation> {
        if let Some(animation) = self.animations.get_mut(id) {
            animation.binding = None;
        }
        self.end(id, None, Departure::Stopped, fx);
        let animation = self.animations.remove(id);
        self.bindings.retain(|_, bound| *bound != id);
        animation
    }

    fn stop(
        &mut self,
        id: AnimationId,
        position: StopPosition,
        immediately: bool,
        fx: &mut Vec<Effect>,
    ) {
        let Some(animation) = self.animations.get_mut(id) else {
            return;
        };
        if animation.state == AnimationState::Ended {
            return;
        }
        tracing::debug!(?id, ?position, immediately, "animation stopped");

        if immediately {
            animation.jump_to(position);
            let at = animation.motion.value.clone();
            if position != StopPosition::Current {
                if let Some(callback) = animation.value_changed.clone() {
                    fx.push(Effect::Value(callback, at.clone()));
                }
            }
            let departure = if position == StopPosition::End {
                Departure::Finished
            } else {
                Departure::Stopped
            };
            self.end(id, Some(AnimationEvent::Finished { at }), departure, fx);
        } else {
            let target = animation.stop_target(position);
            animation.retarget(target);
            if animation.state == AnimationState::Inactive
                && !self.pending.iter().any(|pending| pending.id == id)
            {
                self.start_now(id, fx);
            }
        }
    }

    fn retarget(&mut self, id: AnimationId, target: AnimationVector, fx: &mut Vec<Effect>) {
        let Some(animation) = self.animations.get_mut(id) else {
            return;
        };
        if let Some(event) = animation.retarget(target) {
            tracing::debug!(?id, "animation retargeted");
            if let Some(callback) = animation.completion.clone() {
                fx.push(Effect::Completion(callback, event));
            }
            if let Some(group) = animation.group {
                self.groups.mark_retargeted(group);
            }
        }
    }

    fn complete_group(&mut self, completed: CompletedGroup, fx: &mut Vec<Effect>) {
        tracing::debug!(
            group = completed.group.raw(),
            retargeted = completed.outcome.retargeted,
            stopped = completed.outcome.stopped,
            "group finished"
        );
        if let Some(handler) = completed.handler {
            fx.push(Effect::Group(handler, completed.outcome));
        }
    }

    fn release_binding(&mut self, binding: BindingKey, id: AnimationId) {
        if self.bindings.get(&binding) == Some(&id) {
            self.bindings.remove(&binding);
        }
    }

    // =========================================================================
    // Frame Clock
    // =========================================================================

    fn wake(&mut self, fx: &mut Vec<Effect>) {
        if self.clock_running {
            return;
        }
        self.clock_running = true;
        self.last_frame = Some(Instant::now());
        tracing::debug!("scheduler resumed");
        if let Some(clock) = self.clock.clone() {
            fx.push(Effect::Clock(clock, true));
        }
    }

    fn sleep_if_idle(&mut self, fx: &mut Vec<Effect>) {
        if self.is_active() || !self.clock_running {
            return;
        }
        self.clock_running = false;
        self.last_frame = None;
        tracing::debug!(frame = self.frame, "scheduler idle");
        if let Some(clock) = self.clock.clone() {
            fx.push(Effect::Clock(clock, false));
        }
    }

    // =========================================================================
    // Frame
    // =========================================================================

    fn step_frame(&mut self, dt: f64, fx: &mut Vec<Effect>) -> bool {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.settings.max_frame_delta)
        } else {
            0.0
        };
        self.frame += 1;

        // Promote delayed starts, stepping them by the part of the frame
        // left after their delay ran out
        let mut leftovers: Vec<(AnimationId, f64)> = Vec::new();
        let mut waiting = Vec::with_capacity(self.pending.len());
        for mut pending in std::mem::take(&mut self.pending) {
            pending.remaining -= dt;
            if pending.remaining <= 0.0 {
                leftovers.push((pending.id, -pending.remaining));
            } else {
                waiting.push(pending);
            }
        }
        self.pending = waiting;
        for &(id, _) in &leftovers {
            self.start_now(id, fx);
        }

        // Animations whose owner is gone are dropped, not stepped
        let orphaned: Vec<AnimationId> = self
            .running
            .iter()
            .copied()
            .chain(self.pending.iter().map(|pending| pending.id))
            .filter(|id| self.animations.get(*id).map_or(true, |a| !a.owner_alive()))
            .collect();
        for id in orphaned {
            tracing::debug!(?id, "pruning animation of a dropped object");
            self.discard(id, fx);
        }

        let mut order: Vec<AnimationId> = self.running.iter().copied().collect();
        order.sort_by_key(|id| Reverse(self.animations[*id].relative_priority));

        tracing::trace!(frame = self.frame, dt, running = order.len(), "tick");

        let mut finished = Vec::new();
        for id in order {
            let step_dt = leftovers
                .iter()
                .find(|(started, _)| *started == id)
                .map_or(dt, |(_, leftover)| *leftover);
            let Some(animation) = self.animations.get_mut(id) else {
                continue;
            };
            let advance = animation.advance(step_dt, &self.settings);
            if let Some(callback) = &animation.value_changed {
                fx.push(Effect::Value(callback.clone(), advance.value));
            }
            if advance.finished {
                finished.push(id);
            }
        }

        for id in finished {
            let at = self.animations[id].motion.value.clone();
            tracing::debug!(?id, "animation finished");
            self.end(id, Some(AnimationEvent::Finished { at }), Departure::Finished, fx);
        }

        self.sleep_if_idle(fx);
        self.is_active()
    }

    // =========================================================================
    // Property Bindings
    // =========================================================================

    /// The animation bound to `binding`, if its owner is still alive
    fn live_binding(&mut self, binding: BindingKey, fx: &mut Vec<Effect>) -> Option<AnimationId> {
        let id = *self.bindings.get(&binding)?;
        match self.animations.get(id) {
            Some(animation) if animation.owner_alive() => Some(id),
            Some(_) => {
                self.discard(id, fx);
                None
            }
            None => {
                self.bindings.remove(&binding);
                None
            }
        }
    }

    fn submit(&mut self, write: PropertyWrite, fx: &mut Vec<Effect>) -> Option<AnimationId> {
        let kind = write.config.kind.driver_kind()?;
        let mut from = write.from;
        let mut carried_velocity = None;

        if let Some(id) = self.live_binding(write.binding, fx) {
            let existing = &self.animations[id];
            if existing.kind() == kind {
                self.reuse(id, write.config, write.target, write.sink, fx);
                return Some(id);
            }

            // Driver kind changed: hand value (and velocity, for springs)
            // over to a fresh animation in the same slot
            from = existing.motion.value.clone();
            if matches!(write.config.kind, AnimationKind::Spring { .. }) {
                carried_velocity = Some(existing.motion.velocity.clone());
            }
            let event = AnimationEvent::Retargeted {
                from: existing.motion.target.clone(),
                to: write.target.clone(),
            };
            tracing::debug!(?id, from = ?existing.kind(), to = ?kind, "replacing animation driver");
            self.end(id, Some(event), Departure::Retargeted, fx);
        }

        let mut animation =
            Animation::from_config(&write.config, from, write.target, carried_velocity)?;
        animation.owner = Some(write.owner);
        animation.binding = Some(write.binding);
        animation.value_changed = Some(write.sink);
        animation.group = Some(write.config.group);

        let id = self.insert(animation);
        self.bindings.insert(write.binding, id);
        self.groups.join(write.config.group, id);
        tracing::debug!(?id, property = %write.binding.key, ?kind, "property animation created");
        self.schedule(id, fx);
        Some(id)
    }

    fn reuse(
        &mut self,
        id: AnimationId,
        config: AnimationConfig,
        target: AnimationVector,
        sink: ValueCallback,
        fx: &mut Vec<Effect>,
    ) {
        let Some(animation) = self.animations.get_mut(id) else {
            return;
        };
        animation.reconfigure(&config);
        animation.value_changed = Some(sink);

        let previous_group = animation.group.replace(config.group);
        let switched_group = previous_group != Some(config.group);

        let event = match &config.kind {
            AnimationKind::Decay {
                mode: DecayMode::Velocity,
                ..
            } => {
                animation.set_velocity(target);
                None
            }
            AnimationKind::Spring {
                initial_velocity, ..
            } => {
                let event = animation.retarget(target);
                if let Some(velocity) = initial_velocity {
                    animation.inject_velocity(velocity.clone());
                }
                event
            }
            _ => animation.retarget(target),
        };
        if let (Some(event), Some(callback)) = (event.as_ref(), animation.completion.clone()) {
            fx.push(Effect::Completion(callback, event.clone()));
        }

        let running = animation.state == AnimationState::Running;
        let blocks = animation
            .binding
            .filter(|_| animation.prevents_interaction)
            .map(|binding| binding.object);
        tracing::debug!(?id, "property animation retargeted");

        if switched_group {
            if let Some(previous) = previous_group {
                if let Some(completed) = self.groups.leave(previous, id, Departure::Retargeted) {
                    self.complete_group(completed, fx);
                }
            }
            self.groups.join(config.group, id);
        } else if event.is_some() {
            self.groups.mark_retargeted(config.group);
        }

        match blocks {
            Some(object) if running => self.block(id, object, fx),
            Some(_) => {}
            None => self.unblock(id, fx),
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    fn block(&mut self, id: AnimationId, object: usize, fx: &mut Vec<Effect>) {
        if self.interaction.holders.insert(id, object).is_some() {
            return;
        }
        let count = self.interaction.blocked.entry(object).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.notify_interaction(object, false, fx);
        }
    }

    fn unblock(&mut self, id: AnimationId, fx: &mut Vec<Effect>) {
        let Some(object) = self.interaction.holders.remove(&id) else {
            return;
        };
        let Some(count) = self.interaction.blocked.get_mut(&object) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.interaction.blocked.remove(&object);
            self.notify_interaction(object, true, fx);
        }
    }

    fn notify_interaction(&self, object: usize, enabled: bool, fx: &mut Vec<Effect>) {
        tracing::debug!(object, enabled, "interaction changed");
        if let Some(listeners) = self.interaction.listeners.get(&object) {
            for listener in listeners {
                fx.push(Effect::Interaction(listener.clone(), enabled));
            }
        }
    }
}

/// Resets the re-entrancy flag once a tick's callbacks have run
struct TickReset<'a>(&'a RefCell<SchedulerInner>);

impl Drop for TickReset<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.ticking = false;
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Owner of the animation state
///
/// Dereferences to its [`SchedulerHandle`], which carries the API. Handles
/// are weak: once the scheduler is dropped every handle operation becomes
/// a no-op.
///
/// ```rust
/// use wave_animation::{Animation, Scheduler, Spring};
///
/// let scheduler = Scheduler::new();
/// let id = scheduler
///     .add(Animation::spring(Spring::smooth(), &0.0, &1.0))
///     .expect("scheduler is alive");
/// scheduler.start(id);
///
/// while scheduler.tick(1.0 / 60.0) {}
/// assert_eq!(scheduler.animation(id).map(|info| info.value[0]), Some(1.0));
/// ```
pub struct Scheduler {
    _inner: Rc<RefCell<SchedulerInner>>,
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::from_settings(SchedulerSettings::default())
    }

    /// Create a scheduler with validated settings
    pub fn with_settings(settings: SchedulerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::from_settings(settings))
    }

    fn from_settings(settings: SchedulerSettings) -> Self {
        let inner = Rc::new(RefCell::new(SchedulerInner::new(settings)));
        let handle = SchedulerHandle {
            inner: Rc::downgrade(&inner),
        };
        Self {
            _inner: inner,
            handle,
        }
    }

    /// Get a handle to this scheduler for passing to animators
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Scheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

/// A weak handle to a scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Mutate the state, then run the collected callbacks
    fn update<R>(&self, f: impl FnOnce(&mut SchedulerInner, &mut Vec<Effect>) -> R) -> Option<R> {
        let inner = self.inner.upgrade()?;
        let mut effects = Vec::new();
        let result = {
            let Ok(mut guard) = inner.try_borrow_mut() else {
                tracing::warn!("scheduler is busy, ignoring re-entrant call");
                return None;
            };
            f(&mut guard, &mut effects)
        };
        flush(effects);
        Some(result)
    }

    fn read<R>(&self, f: impl FnOnce(&SchedulerInner) -> R) -> Option<R> {
        let inner = self.inner.upgrade()?;
        let guard = inner.try_borrow().ok()?;
        Some(f(&guard))
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.read(|inner| inner.settings.clone())
            .unwrap_or_default()
    }

    pub fn set_settings(&self, settings: SchedulerSettings) -> Result<()> {
        settings.validate()?;
        self.update(|inner, _| inner.settings = settings);
        Ok(())
    }

    /// Install the host's frame clock. It is resumed right away if
    /// animations are already live.
    pub fn set_frame_clock(&self, clock: Rc<dyn FrameClock>) {
        self.update(|inner, fx| {
            if inner.clock_running {
                fx.push(Effect::Clock(clock.clone(), true));
            }
            inner.clock = Some(clock);
        });
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advance every animation by `dt` seconds.
    ///
    /// Returns `true` while animations are running or waiting on a delay.
    /// A tick requested from a callback of the tick in progress is skipped.
    pub fn tick(&self, dt: f64) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut effects = Vec::new();
        let active = {
            let Ok(mut guard) = inner.try_borrow_mut() else {
                tracing::warn!("tick requested while the scheduler is borrowed, skipping");
                return false;
            };
            if guard.ticking {
                tracing::warn!("tick requested while a frame is in progress, skipping");
                return guard.is_active();
            }
            guard.ticking = true;
            guard.step_frame(dt, &mut effects)
        };

        let _reset = TickReset(&inner);
        flush(effects);
        active
    }

    /// Advance by the wall-clock time since the previous frame
    pub fn tick_now(&self) -> bool {
        let dt = self
            .update(|inner, _| {
                let now = Instant::now();
                let dt = inner
                    .last_frame
                    .map_or(0.0, |last| now.duration_since(last).as_secs_f64());
                inner.last_frame = Some(now);
                dt
            })
            .unwrap_or(0.0);
        self.tick(dt)
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.read(|inner| inner.frame).unwrap_or(0)
    }

    /// Check if any animation is running or waiting on a delay
    pub fn has_active_animations(&self) -> bool {
        self.read(|inner| inner.is_active()).unwrap_or(false)
    }

    /// Number of animations held by the scheduler, including ended
    /// standalone ones
    pub fn animation_count(&self) -> usize {
        self.read(|inner| inner.animations.len()).unwrap_or(0)
    }

    pub fn running_count(&self) -> usize {
        self.read(|inner| inner.running.len()).unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.read(|inner| inner.pending.len()).unwrap_or(0)
    }

    // =========================================================================
    // Context Stack
    // =========================================================================

    /// Push `config` onto the context stack until the returned guard drops
    pub fn begin(&self, config: AnimationConfig) -> AnimationScope {
        if let Err(error) = config.validate() {
            tracing::warn!(%error, "animation scope opened with an invalid config");
        }
        let group = config.group;
        let token = self
            .update(|inner, _| {
                inner.groups.open_scope(group);
                inner.next_scope += 1;
                let token = inner.next_scope;
                inner.scopes.push(ScopeFrame { token, config });
                token
            })
            .unwrap_or(0);
        AnimationScope::new(self.clone(), token, group)
    }

    pub(crate) fn end_scope(&self, token: u64) {
        self.update(|inner, fx| {
            // Already closed along with an enclosing scope
            let Some(index) = inner.scopes.iter().position(|frame| frame.token == token) else {
                return;
            };
            if index + 1 != inner.scopes.len() {
                tracing::warn!(
                    open = inner.scopes.len(),
                    closing = index + 1,
                    "animation scope closed out of order, closing inner scopes too"
                );
            }
            while inner.scopes.len() > index {
                let Some(frame) = inner.scopes.pop() else {
                    break;
                };
                if let Some(completed) = inner.groups.close_scope(frame.config.group) {
                    inner.complete_group(completed, fx);
                }
            }
        });
    }

    /// Run `writes` with `config` on the context stack. Returns the group
    /// the created animations belong to.
    pub fn animate<F: FnOnce()>(&self, config: AnimationConfig, writes: F) -> GroupId {
        let scope = self.begin(config);
        let group = scope.group();
        writes();
        drop(scope);
        group
    }

    /// Like [`SchedulerHandle::animate`], calling `completion` once every
    /// animation created by `writes` has ended
    pub fn animate_with_completion<F, C>(
        &self,
        config: AnimationConfig,
        writes: F,
        completion: C,
    ) -> GroupId
    where
        F: FnOnce(),
        C: FnOnce(GroupOutcome) + 'static,
    {
        let scope = self.begin(config);
        let group = scope.group();
        self.on_group_finished(group, completion);
        writes();
        drop(scope);
        group
    }

    /// Run `writes` synchronously, whatever scope encloses them
    pub fn non_animate<F: FnOnce()>(&self, writes: F) {
        self.animate(AnimationConfig::non_animated(), writes);
    }

    /// The config governing writes right now
    pub fn current_config(&self) -> Option<AnimationConfig> {
        self.read(|inner| inner.scopes.last().map(|frame| frame.config.clone()))
            .flatten()
    }

    /// Call `handler` once every animation of `group` has ended. A group
    /// that already completed (or never existed) calls it right away.
    pub fn on_group_finished<F>(&self, group: GroupId, handler: F)
    where
        F: FnOnce(GroupOutcome) + 'static,
    {
        self.update(|inner, fx| {
            if let Some(completed) = inner.groups.set_handler(group, Box::new(handler)) {
                inner.complete_group(completed, fx);
            }
        });
    }

    /// Number of animations still running in `group`
    pub fn group_member_count(&self, group: GroupId) -> usize {
        self.read(|inner| inner.groups.member_count(group))
            .unwrap_or(0)
    }

    // =========================================================================
    // Standalone Animations
    // =========================================================================

    /// Register an animation. It stays inactive until [`start`](Self::start).
    pub fn add(&self, animation: Animation) -> Option<AnimationId> {
        self.update(|inner, _| inner.insert(animation))
    }

    /// Start or resume an animation. An ended animation runs again from
    /// its start value.
    pub fn start(&self, id: AnimationId) {
        self.update(|inner, fx| {
            let Some(animation) = inner.animations.get_mut(id) else {
                return;
            };
            match animation.state {
                AnimationState::Running => return,
                AnimationState::Ended => animation.rewind(),
                AnimationState::Inactive => {}
            }
            let fresh = animation.running_time == 0.0;
            let queued = inner.pending.iter().any(|pending| pending.id == id);
            if queued {
                return;
            }
            if fresh {
                inner.schedule(id, fx);
            } else {
                inner.start_now(id, fx);
            }
        });
    }

    /// Stop stepping an animation, keeping its state for [`start`](Self::start)
    pub fn pause(&self, id: AnimationId) {
        self.update(|inner, fx| {
            let Some(animation) = inner.animations.get_mut(id) else {
                return;
            };
            if animation.state == AnimationState::Ended {
                return;
            }
            animation.state = AnimationState::Inactive;
            inner.running.shift_remove(&id);
            inner.pending.retain(|pending| pending.id != id);
            inner.unblock(id, fx);
            tracing::debug!(?id, "animation paused");
            inner.sleep_if_idle(fx);
        });
    }

    /// Stop an animation.
    ///
    /// With `immediately`, the value is placed at `position` and the
    /// animation ends now. Otherwise it is redirected to `position` and
    /// settles there under its driver.
    pub fn stop(&self, id: AnimationId, position: StopPosition, immediately: bool) {
        self.update(|inner, fx| {
            inner.stop(id, position, immediately, fx);
            inner.sleep_if_idle(fx);
        });
    }

    /// Remove an animation without calling its completion
    pub fn remove(&self, id: AnimationId) -> Option<Animation> {
        self.update(|inner, fx| {
            let removed = inner.discard(id, fx);
            inner.sleep_if_idle(fx);
            removed
        })
        .flatten()
    }

    /// Redirect an animation towards `target`
    pub fn retarget(&self, id: AnimationId, target: AnimationVector) {
        self.update(|inner, fx| inner.retarget(id, target, fx));
    }

    /// Typed variant of [`retarget`](Self::retarget)
    pub fn retarget_to<T: Animatable>(&self, id: AnimationId, target: &T) {
        self.retarget(id, target.to_vector());
    }

    /// Replace an animation's velocity without restarting it
    pub fn set_velocity(&self, id: AnimationId, velocity: AnimationVector) {
        self.update(|inner, _| {
            if let Some(animation) = inner.animations.get_mut(id) {
                animation.set_velocity(velocity);
            }
        });
    }

    /// Scrub an easing animation to `fraction` and report the new value
    pub fn set_fraction_complete(&self, id: AnimationId, fraction: f64) {
        self.update(|inner, fx| {
            let Some(animation) = inner.animations.get_mut(id) else {
                return;
            };
            if !animation.scrub(fraction) {
                tracing::debug!(?id, "only easing animations can be scrubbed");
                return;
            }
            if let Some(callback) = animation.value_changed.clone() {
                fx.push(Effect::Value(callback, animation.motion.value.clone()));
            }
        });
    }

    /// Snapshot of an animation
    pub fn animation(&self, id: AnimationId) -> Option<AnimationInfo> {
        self.read(|inner| inner.animations.get(id).map(Animation::info))
            .flatten()
    }

    pub fn state(&self, id: AnimationId) -> Option<AnimationState> {
        self.read(|inner| inner.animations.get(id).map(|a| a.state))
            .flatten()
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.state(id) == Some(AnimationState::Running)
    }

    // =========================================================================
    // Property Bindings (used by the animator)
    // =========================================================================

    pub(crate) fn submit(&self, write: PropertyWrite) -> Option<AnimationId> {
        self.update(|inner, fx| inner.submit(write, fx)).flatten()
    }

    pub(crate) fn binding_info(&self, binding: BindingKey) -> Option<AnimationInfo> {
        self.read(|inner| {
            let id = *inner.bindings.get(&binding)?;
            inner
                .animations
                .get(id)
                .filter(|animation| animation.owner_alive())
                .map(Animation::info)
        })
        .flatten()
    }

    pub(crate) fn stop_binding(&self, binding: BindingKey, position: StopPosition, immediately: bool) {
        self.update(|inner, fx| {
            if let Some(id) = inner.live_binding(binding, fx) {
                inner.stop(id, position, immediately, fx);
            }
            inner.sleep_if_idle(fx);
        });
    }

    pub(crate) fn set_binding_velocity(&self, binding: BindingKey, velocity: AnimationVector) -> bool {
        self.update(|inner, fx| {
            let Some(id) = inner.live_binding(binding, fx) else {
                return false;
            };
            if let Some(animation) = inner.animations.get_mut(id) {
                animation.set_velocity(velocity);
            }
            true
        })
        .unwrap_or(false)
    }

    pub(crate) fn is_object_blocked(&self, object: usize) -> bool {
        self.read(|inner| inner.interaction.blocked.contains_key(&object))
            .unwrap_or(false)
    }

    pub(crate) fn add_interaction_listener(&self, object: usize, listener: InteractionListener) {
        self.update(|inner, _| {
            inner
                .interaction
                .listeners
                .entry(object)
                .or_default()
                .push(listener);
        });
    }

    pub(crate) fn remove_interaction_listeners(&self, object: usize) {
        self.update(|inner, _| {
            inner.interaction.listeners.remove(&object);
        });
    }
}

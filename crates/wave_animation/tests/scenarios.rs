//! End-to-end scenarios driving the property animator through a scheduler

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wave_animation::{
    animate, non_animate, shared_scheduler, AnimationConfig, AnimationEvent, DriverKind,
    GroupOutcome, Property, PropertyAnimator, Scheduler, Spring, StopPosition, TimingFunction,
};
use wave_core::vector::approx_eq;
use wave_core::Point;

const FRAME: f64 = 1.0 / 60.0;

#[derive(Debug, Default)]
struct View {
    x: f64,
    y: f64,
    origin: Point,
    writes: usize,
}

const X: Property<View, f64> = Property::new(
    "x",
    |view| view.x,
    |view, value| {
        view.x = value;
        view.writes += 1;
    },
);
const Y: Property<View, f64> = Property::new("y", |view| view.y, |view, value| view.y = value);
const ORIGIN: Property<View, Point> =
    Property::new("origin", |view| view.origin, |view, value| view.origin = value);

fn setup() -> (Scheduler, Rc<RefCell<View>>, PropertyAnimator<View>) {
    let scheduler = Scheduler::new();
    let view = Rc::new(RefCell::new(View::default()));
    let animator = PropertyAnimator::new(&view, scheduler.handle());
    (scheduler, view, animator)
}

/// Tick until idle, returning the number of frames
fn settle(scheduler: &Scheduler) -> usize {
    let mut frames = 0;
    while scheduler.tick(FRAME) {
        frames += 1;
        assert!(frames < 10_000, "animations never settled");
    }
    frames
}

#[test]
fn critically_damped_spring_reaches_target_without_overshoot() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::new(1.0, 0.5)), || {
        animator.set(&X, 100.0);
    });

    let mut peak: f64 = 0.0;
    while scheduler.tick(FRAME) {
        peak = peak.max(view.borrow().x);
    }
    assert!(peak <= 100.0 + 0.01, "overshot to {peak}");
    assert_eq!(view.borrow().x, 100.0);
}

#[test]
fn springs_settle_within_a_bound_proportional_to_response() {
    for damping_ratio in [0.2, 0.4, 0.6, 0.8, 1.0] {
        for response in [0.1, 0.35, 0.8, 1.5] {
            let spring = Spring::new(damping_ratio, response);
            let (scheduler, view, animator) = setup();
            scheduler.animate(AnimationConfig::spring(spring), || {
                animator.set(&X, 100.0);
            });

            let elapsed = settle(&scheduler) as f64 * FRAME;
            assert!(
                elapsed <= 2.0 * response / damping_ratio + 2.0 * FRAME,
                "ratio {damping_ratio} response {response} took {elapsed}s"
            );
            assert!(elapsed <= spring.settling_duration() + 2.0 * FRAME);
            assert_eq!(view.borrow().x, 100.0);
        }
    }
}

#[test]
fn bouncy_spring_converges_to_target() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::bouncy()), || {
        animator.set(&ORIGIN, Point::new(-40.0, 250.0));
    });

    let frames = settle(&scheduler);
    let settling = Spring::bouncy().settling_duration();
    assert!((frames as f64) * FRAME <= settling + 2.0 * FRAME);
    assert_eq!(view.borrow().origin, Point::new(-40.0, 250.0));
}

#[test]
fn retargeting_keeps_value_and_velocity() {
    let (scheduler, _view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 100.0);
    });
    for _ in 0..10 {
        scheduler.tick(FRAME);
    }
    let before = animator.animation(&X).unwrap();
    assert!(before.velocity[0] > 0.0);

    scheduler.animate(AnimationConfig::spring(Spring::snappy()), || {
        animator.set(&X, 200.0);
    });
    let after = animator.animation(&X).unwrap();

    assert_eq!(after.id, before.id);
    assert_eq!(after.value, before.value);
    assert_eq!(after.velocity, before.velocity);
    assert_eq!(after.target.as_slice(), &[200.0]);
}

#[test]
fn changing_driver_kind_creates_new_animation() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 100.0);
    });
    scheduler.tick(FRAME);
    let spring = animator.animation(&X).unwrap();

    scheduler.animate(AnimationConfig::easing(TimingFunction::ease_out(), 0.3), || {
        animator.set(&X, 50.0);
    });
    let easing = animator.animation(&X).unwrap();
    assert_ne!(easing.id, spring.id);
    assert_eq!(easing.kind, DriverKind::Easing);
    assert_eq!(easing.value, spring.value);
    assert_eq!(scheduler.animation_count(), 1);

    settle(&scheduler);
    assert_eq!(view.borrow().x, 50.0);
}

#[test]
fn same_target_under_another_driver_kind_still_animates() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 100.0);
    });
    scheduler.tick(FRAME);
    let spring = animator.animation(&X).unwrap();

    scheduler.animate(AnimationConfig::easing(TimingFunction::linear(), 0.5), || {
        animator.set(&X, 100.0);
    });
    let easing = animator.animation(&X).unwrap();
    assert_ne!(easing.id, spring.id);
    assert_eq!(easing.kind, DriverKind::Easing);
    assert_eq!(easing.target.as_slice(), &[100.0]);
    assert_eq!(scheduler.animation_count(), 1);

    settle(&scheduler);
    assert_eq!(view.borrow().x, 100.0);
}

#[test]
fn group_completion_fires_once_after_last_member() {
    let (scheduler, _view, animator) = setup();
    let calls = Rc::new(Cell::new(0));
    let outcome = Rc::new(Cell::new(None::<GroupOutcome>));

    let (count, seen) = (calls.clone(), outcome.clone());
    scheduler.animate_with_completion(
        AnimationConfig::spring(Spring::smooth()),
        || {
            animator.set(&X, 10.0);
            animator.set(&Y, 1000.0);
            animator.set(&ORIGIN, Point::new(5.0, 5.0));
        },
        move |result| {
            count.set(count.get() + 1);
            seen.set(Some(result));
        },
    );

    scheduler.tick(FRAME);
    assert_eq!(calls.get(), 0);

    settle(&scheduler);
    assert_eq!(calls.get(), 1);
    assert!(outcome.get().is_some_and(|o| o.finished()));
}

#[test]
fn redirected_member_marks_its_group_retargeted() {
    let (scheduler, view, animator) = setup();
    let first = Rc::new(Cell::new(None::<GroupOutcome>));
    let second = Rc::new(Cell::new(None::<GroupOutcome>));

    let seen = first.clone();
    scheduler.animate_with_completion(
        AnimationConfig::spring(Spring::smooth()),
        || animator.set(&X, 100.0),
        move |result| seen.set(Some(result)),
    );
    scheduler.tick(FRAME);

    let seen = second.clone();
    scheduler.animate_with_completion(
        AnimationConfig::spring(Spring::smooth()),
        || animator.set(&X, -100.0),
        move |result| seen.set(Some(result)),
    );
    assert!(first.get().is_some_and(|o| o.retargeted));
    assert!(second.get().is_none());

    settle(&scheduler);
    assert!(second.get().is_some_and(|o| o.finished()));
    assert_eq!(view.borrow().x, -100.0);
}

#[test]
fn writing_the_current_value_is_a_no_op() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 0.0);
    });
    assert_eq!(scheduler.animation_count(), 0);
    assert_eq!(view.borrow().writes, 0);

    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 80.0);
    });
    scheduler.tick(FRAME);
    let before = animator.animation(&X).unwrap();
    let writes = view.borrow().writes;

    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 80.0);
    });
    assert_eq!(animator.animation(&X), Some(before));
    assert_eq!(view.borrow().writes, writes);
}

#[test]
fn decay_moves_monotonically_and_comes_to_rest() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::decay(0.998), || {
        animator.set(&X, 800.0);
    });
    let destination = animator.get(&X).unwrap();

    let mut previous = 0.0;
    let mut speed = f64::INFINITY;
    while scheduler.tick(FRAME) {
        let x = view.borrow().x;
        assert!(x >= previous);
        previous = x;

        let velocity = animator.velocity(&X).unwrap();
        assert!(velocity > 0.0 && velocity < speed);
        speed = velocity;
    }
    let x = view.borrow().x;
    assert!(x > 0.0);
    assert!((x - destination).abs() < 1.0);
}

#[test]
fn decay_to_value_comes_to_rest_near_it() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::decay_to(0.99), || {
        animator.set(&X, 300.0);
    });
    settle(&scheduler);
    assert!(approx_eq(&[view.borrow().x], &[300.0], 0.5));
}

#[test]
fn linear_easing_is_halfway_at_half_duration() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::easing(TimingFunction::linear(), 1.0), || {
        animator.set(&X, 10.0);
    });

    scheduler.tick(0.25);
    scheduler.tick(0.25);
    assert!(approx_eq(&[view.borrow().x], &[5.0], 1e-9));

    settle(&scheduler);
    assert_eq!(view.borrow().x, 10.0);
}

#[test]
fn non_animated_write_cancels_delayed_animation() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(
        AnimationConfig::spring(Spring::smooth()).with_delay(0.5),
        || animator.set(&X, 100.0),
    );
    scheduler.tick(0.1);
    assert_eq!(scheduler.pending_count(), 1);
    assert_eq!(view.borrow().x, 0.0);

    scheduler.non_animate(|| animator.set(&X, 7.0));
    assert_eq!(view.borrow().x, 7.0);
    assert_eq!(scheduler.pending_count(), 0);
    assert!(!scheduler.has_active_animations());
}

#[test]
fn nested_non_animated_scope_applies_immediately() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 100.0);
        scheduler.non_animate(|| animator.set(&Y, 5.0));
        animator.set(&ORIGIN, Point::new(1.0, 2.0));
    });

    assert_eq!(view.borrow().y, 5.0);
    assert_eq!(view.borrow().x, 0.0);
    assert!(animator.is_animating(&X));
    assert!(animator.is_animating(&ORIGIN));
    assert!(!animator.is_animating(&Y));
}

#[test]
fn stop_reports_position_to_completion() {
    let (scheduler, view, animator) = setup();
    let outcome = Rc::new(Cell::new(None::<GroupOutcome>));
    let seen = outcome.clone();
    scheduler.animate_with_completion(
        AnimationConfig::easing(TimingFunction::linear(), 1.0),
        || animator.set(&X, 10.0),
        move |result| seen.set(Some(result)),
    );
    scheduler.tick(0.5);

    animator.stop(&X, StopPosition::End, true);
    assert_eq!(view.borrow().x, 10.0);
    assert!(outcome.get().is_some_and(|o| o.finished()));
    assert!(!animator.is_animating(&X));
}

#[test]
fn standalone_completion_sees_final_value() {
    let scheduler = Scheduler::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = events.clone();

    let animation = wave_animation::Animation::spring(Spring::snappy(), &1.0, &0.0)
        .on_completion(move |event| log.borrow_mut().push(event.clone()));
    let id = scheduler.add(animation).unwrap();
    scheduler.start(id);
    settle(&scheduler);

    assert_eq!(events.borrow().len(), 1);
    assert!(matches!(
        &events.borrow()[0],
        AnimationEvent::Finished { at } if at.as_slice() == [0.0]
    ));
}

#[test]
fn shared_scheduler_drives_free_functions() {
    let view = Rc::new(RefCell::new(View::default()));
    let animator = PropertyAnimator::shared(&view);

    animate(AnimationConfig::spring(Spring::snappy()), || {
        animator.set(&X, 30.0);
    });
    non_animate(|| animator.set(&Y, 3.0));
    assert_eq!(view.borrow().y, 3.0);

    let scheduler = shared_scheduler();
    while scheduler.tick(FRAME) {}
    assert_eq!(view.borrow().x, 30.0);
}

#[test]
fn dropped_view_is_pruned_without_stepping() {
    let (scheduler, view, animator) = setup();
    scheduler.animate(AnimationConfig::spring(Spring::smooth()), || {
        animator.set(&X, 100.0);
        animator.set(&Y, 100.0);
    });
    scheduler.tick(FRAME);
    assert_eq!(scheduler.running_count(), 2);

    drop(view);
    assert!(!scheduler.tick(FRAME));
    assert_eq!(scheduler.animation_count(), 0);
    assert!(!animator.is_alive());
}

#[test]
fn dropped_view_with_delayed_animation_is_pruned() {
    let (scheduler, view, animator) = setup();
    let outcome = Rc::new(Cell::new(None::<GroupOutcome>));
    let seen = outcome.clone();
    scheduler.animate_with_completion(
        AnimationConfig::spring(Spring::smooth()).with_delay(5.0),
        || animator.set(&X, 100.0),
        move |result| seen.set(Some(result)),
    );
    assert_eq!(scheduler.pending_count(), 1);

    drop(view);
    assert!(!scheduler.tick(FRAME));
    assert_eq!(scheduler.animation_count(), 0);
    assert_eq!(scheduler.pending_count(), 0);
    assert!(!scheduler.has_active_animations());
    assert!(outcome.get().is_some_and(|o| o.stopped));
}

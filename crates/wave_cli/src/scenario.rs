//! Headless scenario runner
//!
//! Animates one property of an in-memory host object under a scenario's
//! config and records every frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::Serialize;
use wave_animation::{GroupOutcome, Property, PropertyAnimator, Scheduler, SchedulerSettings};

use crate::config::ScenarioConfig;

/// Stand-in for a host view
#[derive(Debug)]
struct Sample {
    value: Vec<f64>,
}

const VALUE: Property<Sample, Vec<f64>> = Property::new(
    "value",
    |sample| sample.value.clone(),
    |sample, value| sample.value = value,
);

#[derive(Debug, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub time: f64,
    pub value: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub driver: &'static str,
    pub frames: Vec<FrameRecord>,
    pub final_value: Vec<f64>,
    /// Simulated seconds until the animation ended
    pub duration: f64,
    /// Whether the animation ran to completion undisturbed
    pub finished: bool,
    /// Stopped by the time limit
    pub timed_out: bool,
}

impl ScenarioReport {
    /// Furthest any component travelled past its final value
    pub fn overshoot(&self) -> f64 {
        let Some(first) = self.frames.first() else {
            return 0.0;
        };
        self.frames
            .iter()
            .flat_map(|frame| {
                frame
                    .value
                    .iter()
                    .zip(&first.value)
                    .zip(&self.final_value)
                    .map(|((value, start), end)| (value - end) * (end - start).signum())
            })
            .fold(0.0, f64::max)
    }
}

/// Run `scenario` at `frame_rate` until it ends or `time_limit` seconds pass
pub fn run(
    scenario: &ScenarioConfig,
    settings: &SchedulerSettings,
    frame_rate: f64,
    time_limit: f64,
) -> Result<ScenarioReport> {
    let config = scenario
        .animation_config()
        .with_context(|| format!("Invalid scenario '{}'", scenario.name))?;
    let scheduler = Scheduler::with_settings(settings.clone()).context("Invalid scheduler settings")?;

    let sample = Rc::new(RefCell::new(Sample {
        value: scenario.from.clone(),
    }));
    let animator = PropertyAnimator::new(&sample, scheduler.handle());
    let outcome = Rc::new(Cell::new(None::<GroupOutcome>));

    tracing::debug!(scenario = %scenario.name, driver = scenario.driver.as_str(), "running scenario");

    let seen = outcome.clone();
    scheduler.animate_with_completion(
        config,
        || animator.set(&VALUE, scenario.to.clone()),
        move |result| seen.set(Some(result)),
    );

    let dt = 1.0 / frame_rate;
    let mut time = 0.0;
    let mut frames = vec![FrameRecord {
        frame: 0,
        time,
        value: sample.borrow().value.clone(),
        velocity: animator.velocity(&VALUE),
    }];
    let mut timed_out = false;

    while scheduler.has_active_animations() {
        if time >= time_limit {
            tracing::warn!(scenario = %scenario.name, time_limit, "scenario still running at time limit");
            timed_out = true;
            break;
        }
        scheduler.tick(dt);
        time += dt;
        frames.push(FrameRecord {
            frame: scheduler.frame_count(),
            time,
            value: sample.borrow().value.clone(),
            velocity: animator.velocity(&VALUE),
        });
    }

    let final_value = sample.borrow().value.clone();
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        driver: scenario.driver.as_str(),
        frames,
        final_value,
        duration: time,
        finished: outcome.get().is_some_and(|outcome| outcome.finished()),
        timed_out,
    })
}

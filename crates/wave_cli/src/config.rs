//! Wave configuration file handling
//!
//! `wave.toml` holds the scheduler settings, the simulated frame rate and
//! a list of scenarios:
//!
//! ```toml
//! frame_rate = 120
//!
//! [scheduler]
//! max_frame_delta = 0.05
//!
//! [[scenario]]
//! name = "card-drop"
//! driver = "spring"
//! from = [0.0, 0.0]
//! to = [120.0, 80.0]
//!
//! [scenario.parameters]
//! preset = "bouncy"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use wave_animation::{AnimationConfig, SchedulerSettings, Spring, TimingFunction};
use wave_core::WaveError;

pub const CONFIG_FILE: &str = "wave.toml";

fn default_frame_rate() -> f64 {
    60.0
}

// =============================================================================
// wave.toml
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct WaveConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Frames per simulated second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default, rename = "scenario")]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            frame_rate: default_frame_rate(),
            scenarios: Vec::new(),
        }
    }
}

impl WaveConfig {
    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a configuration document
    pub fn parse(content: &str) -> Result<Self> {
        let config: WaveConfig = toml::from_str(content).context("Invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler
            .validate()
            .context("Invalid [scheduler] table")?;
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            anyhow::bail!("frame_rate must be positive, got {}", self.frame_rate);
        }
        for scenario in &self.scenarios {
            scenario
                .animation_config()
                .with_context(|| format!("Invalid scenario '{}'", scenario.name))?;
        }
        Ok(())
    }

    /// Configured scenarios, or the built-in set when none are configured
    pub fn scenarios_or_builtin(&self) -> Vec<ScenarioConfig> {
        if self.scenarios.is_empty() {
            builtin_scenarios()
        } else {
            self.scenarios.clone()
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverName {
    Spring,
    Easing,
    /// `to` is the initial velocity
    Decay,
    /// `to` is the resting point
    DecayTo,
}

impl DriverName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverName::Spring => "spring",
            DriverName::Easing => "easing",
            DriverName::Decay => "decay",
            DriverName::DecayTo => "decay-to",
        }
    }
}

/// Driver parameters; which fields apply depends on the driver
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DriverParameters {
    /// Spring preset name (interactive, bouncy, smooth, snappy)
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub damping_ratio: Option<f64>,
    #[serde(default)]
    pub response: Option<f64>,
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub initial_velocity: Option<Vec<f64>>,
    /// Easing duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Named timing function
    #[serde(default)]
    pub timing: Option<String>,
    /// Custom cubic bezier control points, overrides `timing`
    #[serde(default)]
    pub bezier: Option<[f64; 4]>,
    /// Decay rate per millisecond
    #[serde(default)]
    pub rate: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub driver: DriverName,
    #[serde(default)]
    pub parameters: DriverParameters,
    pub from: Vec<f64>,
    pub to: Vec<f64>,
    #[serde(default)]
    pub delay: f64,
}

impl ScenarioConfig {
    /// Build the animation config this scenario runs under
    pub fn animation_config(&self) -> wave_core::Result<AnimationConfig> {
        let params = &self.parameters;
        let config = match self.driver {
            DriverName::Spring => {
                let spring = self.spring()?;
                let config = AnimationConfig::spring(spring);
                match &params.initial_velocity {
                    Some(velocity) => config.with_initial_velocity(velocity.iter().copied().collect()),
                    None => config,
                }
            }
            DriverName::Easing => {
                let timing = self.timing()?;
                AnimationConfig::easing(timing, params.duration.unwrap_or(0.3))
            }
            DriverName::Decay => AnimationConfig::decay(self.rate()),
            DriverName::DecayTo => AnimationConfig::decay_to(self.rate()),
        }
        .with_delay(self.delay);

        config.validate()?;
        Ok(config)
    }

    fn spring(&self) -> wave_core::Result<Spring> {
        let params = &self.parameters;
        let mut spring = match params.preset.as_deref() {
            Some(name) => spring_preset(name)
                .ok_or_else(|| WaveError::InvalidSpring(format!("unknown preset '{name}'")))?,
            None => Spring::default(),
        };
        if params.damping_ratio.is_some() || params.response.is_some() {
            spring = Spring::try_new(
                params.damping_ratio.unwrap_or(spring.damping_ratio()),
                params.response.unwrap_or(spring.response()),
            )?;
        }
        if let Some(mass) = params.mass {
            spring = spring.with_mass(mass);
        }
        Ok(spring)
    }

    fn timing(&self) -> wave_core::Result<TimingFunction> {
        let params = &self.parameters;
        if let Some([x1, y1, x2, y2]) = params.bezier {
            return Ok(TimingFunction::bezier(x1, y1, x2, y2));
        }
        match params.timing.as_deref() {
            Some(name) => TimingFunction::from_name(name).ok_or_else(|| {
                WaveError::InvalidSetting(format!("unknown timing function '{name}'"))
            }),
            None => Ok(TimingFunction::default()),
        }
    }

    fn rate(&self) -> f64 {
        self.parameters
            .rate
            .unwrap_or(wave_animation::NORMAL_DECELERATION_RATE)
    }
}

/// Spring preset by name
pub fn spring_preset(name: &str) -> Option<Spring> {
    match name {
        "interactive" => Some(Spring::interactive()),
        "bouncy" => Some(Spring::bouncy()),
        "smooth" => Some(Spring::smooth()),
        "snappy" => Some(Spring::snappy()),
        _ => None,
    }
}

pub const SPRING_PRESETS: [&str; 4] = ["interactive", "bouncy", "smooth", "snappy"];

/// Scenarios run when `wave.toml` defines none
pub fn builtin_scenarios() -> Vec<ScenarioConfig> {
    let scenario = |name: &str, driver, parameters, from: Vec<f64>, to: Vec<f64>| ScenarioConfig {
        name: name.to_string(),
        driver,
        parameters,
        from,
        to,
        delay: 0.0,
    };

    vec![
        scenario(
            "smooth-spring",
            DriverName::Spring,
            DriverParameters {
                preset: Some("smooth".to_string()),
                ..Default::default()
            },
            vec![0.0],
            vec![100.0],
        ),
        scenario(
            "bouncy-spring",
            DriverName::Spring,
            DriverParameters {
                preset: Some("bouncy".to_string()),
                ..Default::default()
            },
            vec![0.0, 0.0],
            vec![120.0, 80.0],
        ),
        scenario(
            "ease-in-out",
            DriverName::Easing,
            DriverParameters {
                timing: Some("ease-in-out".to_string()),
                duration: Some(0.35),
                ..Default::default()
            },
            vec![0.0],
            vec![1.0],
        ),
        scenario(
            "scroll-fling",
            DriverName::Decay,
            DriverParameters::default(),
            vec![0.0],
            vec![2000.0],
        ),
    ]
}

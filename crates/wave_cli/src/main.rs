//! Wave CLI
//!
//! Run animation scenarios headlessly and inspect the driver presets.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wave_animation::{DecayFunction, Spring, TimingFunction};

mod config;
mod scenario;

use config::{WaveConfig, CONFIG_FILE, SPRING_PRESETS};

#[derive(Parser)]
#[command(name = "wave")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wave animation engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios and print their frames
    Simulate {
        /// Only run the scenario with this name
        #[arg(short, long)]
        scenario: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,

        /// Stop a scenario after this many simulated seconds
        #[arg(long, default_value = "30")]
        time_limit: f64,
    },

    /// Show spring presets, timing functions and decay rates
    Presets,

    /// Validate the configuration file
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// One line per scenario
    Summary,
    /// Every frame as pretty JSON
    Json,
    /// One JSON report per line
    Jsonl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            scenario,
            format,
            time_limit,
        } => cmd_simulate(&cli.config, scenario.as_deref(), format, time_limit),

        Commands::Presets => cmd_presets(),

        Commands::Check => cmd_check(&cli.config),
    }
}

fn cmd_simulate(path: &Path, only: Option<&str>, format: Format, time_limit: f64) -> Result<()> {
    let config = WaveConfig::load(path)?;
    let scenarios: Vec<_> = config
        .scenarios_or_builtin()
        .into_iter()
        .filter(|scenario| only.map_or(true, |name| scenario.name == name))
        .collect();

    if scenarios.is_empty() {
        anyhow::bail!("No scenario named '{}'", only.unwrap_or_default());
    }

    info!(
        "Simulating {} scenario(s) at {} fps",
        scenarios.len(),
        config.frame_rate
    );

    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        let report = scenario::run(scenario, &config.scheduler, config.frame_rate, time_limit)?;
        match format {
            Format::Summary => println!(
                "{:<20} {:<9} {:>5} frames {:>7.3}s  final {:?}  overshoot {:.3}{}",
                report.name,
                report.driver,
                report.frames.len(),
                report.duration,
                report.final_value,
                report.overshoot(),
                if report.timed_out { "  (timed out)" } else { "" }
            ),
            Format::Jsonl => println!("{}", serde_json::to_string(&report)?),
            Format::Json => {}
        }
        reports.push(report);
    }

    if let Format::Json = format {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn cmd_presets() -> Result<()> {
    println!("Springs:");
    println!(
        "  {:<12} {:>8} {:>8} {:>10} {:>8} {:>9}",
        "name", "ratio", "response", "stiffness", "damping", "settling"
    );
    for name in SPRING_PRESETS {
        let Some(spring) = config::spring_preset(name) else {
            continue;
        };
        print_spring(name, &spring);
    }
    print_spring("non-animated", &Spring::non_animated());

    println!();
    println!("Timing functions:");
    for name in ["linear", "ease-in", "ease-out", "ease-in-out", "swift-out"] {
        if let Some(timing) = TimingFunction::from_name(name) {
            let samples: Vec<String> = [0.25, 0.5, 0.75]
                .iter()
                .map(|x| format!("{:.3}", timing.solve(*x, 1e-6)))
                .collect();
            println!("  {:<12} {:?}  at 0.25/0.5/0.75: {}", name, timing, samples.join(" "));
        }
    }

    println!();
    println!("Decay rates (from 1000 pt/s):");
    for (name, function) in [
        ("normal", DecayFunction::normal()),
        ("fast", DecayFunction::fast()),
    ] {
        let travel = function.destination(&[0.0], &[1000.0]);
        println!(
            "  {:<12} rate {:<6} travels {:>8.1} pt in {:.2}s",
            name,
            function.rate(),
            travel[0],
            function.duration(&[1000.0], 0.3)
        );
    }
    Ok(())
}

fn print_spring(name: &str, spring: &Spring) {
    println!(
        "  {:<12} {:>8.2} {:>8.2} {:>10.1} {:>8.2} {:>8.3}s",
        name,
        spring.damping_ratio(),
        spring.response(),
        spring.stiffness(),
        spring.damping(),
        spring.settling_duration()
    );
}

fn cmd_check(path: &Path) -> Result<()> {
    if !path.exists() {
        info!("{} not found, defaults apply", path.display());
    }
    let config = WaveConfig::load(path)?;

    info!(
        "Configuration OK: {} scenario(s), {} fps, max frame delta {}s",
        config.scenarios.len(),
        config.frame_rate,
        config.scheduler.max_frame_delta
    );
    Ok(())
}

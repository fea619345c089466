//! Stress chart command-line tool.
//!
//! Pre-computes stress trajectories for many subjects at once:
//! - TOML config file for decay constants, parameter table and logging
//! - JSON input keyed by subject, JSON columnar output
//! - Parallel runs across subjects
//!
//! Usage:
//! ```bash
//! stress_chart generate-config --output stress_chart.toml
//! stress_chart --config stress_chart.toml simulate --input events.json --output chart.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use stress_chart::infra::logging::{init_logging, targets, LogFormat};
use stress_chart::{AppConfig, BatchRunner, SubjectEvents, TrajectoryColumns};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "stress_chart")]
#[command(version, about = "Event-driven stress trajectory engine", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "stress_chart.toml")]
    config: String,

    /// Override the default initial stress
    #[arg(long)]
    initial_stress: Option<f64>,

    /// Override batch worker threads (0 = all cores, 1 = sequential)
    #[arg(long, env = "STRESS_CHART_WORKERS")]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Log file path (logs to both file and stdout)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate every subject in an input file
    Simulate {
        /// JSON object: subject key -> { offsets, types, initial_stress? }
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "stress_chart.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Default, Serialize)]
struct SimulationReport {
    trajectories: BTreeMap<String, TrajectoryColumns>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, String>,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig { output } = &cli.command {
        return generate_sample_config(output);
    }

    let mut config = AppConfig::load(&cli.config)?;
    apply_overrides(&mut config, &cli)?;
    let _guards = init_logging(&config.logging, None)?;

    config.validate()?;

    match &cli.command {
        Commands::Simulate { input, output } => run_simulation(&config, input, output.as_deref()),
        Commands::ValidateConfig => show_config_summary(&cli.config, &config),
        Commands::GenerateConfig { .. } => Ok(()),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn apply_overrides(config: &mut AppConfig, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(initial_stress) = cli.initial_stress {
        config.engine.initial_stress = initial_stress;
    }
    if let Some(workers) = cli.workers {
        config.batch.worker_threads = workers;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.stdout_format = LogFormat::parse(format)
            .ok_or_else(|| format!("Unknown log format '{format}'. Use: pretty, json, compact"))?;
    }
    if let Some(log_file) = &cli.log_file {
        config.logging.log_file = Some(log_file.clone());
    }
    Ok(())
}

fn run_simulation(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = config.parameter_table()?;
    let content = std::fs::read_to_string(input)?;
    let subjects: BTreeMap<String, SubjectEvents> = serde_json::from_str(&content)?;

    info!(
        target: targets::CLI,
        input = %input.display(),
        subjects = subjects.len(),
        event_types = table.len(),
        "Simulating"
    );

    let runner = BatchRunner::new(&config.batch)
        .with_decay(config.decay.to_rule()?)
        .with_initial_stress(config.engine.initial_stress);
    let outcome = runner.run(&subjects, &table);

    let mut report = SimulationReport::default();
    for (key, result) in &outcome.results {
        match result {
            Ok(trajectory) => {
                report.trajectories.insert(key.clone(), trajectory.to_columns());
            }
            Err(e) => {
                warn!(target: targets::CLI, subject = %key, error = %e, "Subject failed");
                report.errors.insert(key.clone(), e.to_string());
            }
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(target: targets::CLI, output = %path.display(), "Trajectories written");
        }
        None => println!("{json}"),
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} of {} subjects failed", report.errors.len(), outcome.len()).into())
    }
}

fn generate_sample_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let content = AppConfig::sample().to_toml()?;

    let with_comments = format!(
        r#"# Stress chart configuration
# See: stress_chart --help
#
# [parameters] maps each event type to its spike coefficients:
#   spike = (stress + adds) * mults
# Set engine.parameters_file to load a columnar JSON table instead.

{}"#,
        content
    );

    std::fs::write(path, with_comments)?;
    println!("Sample config written to: {}", path);
    Ok(())
}

fn show_config_summary(path: &str, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let table = config.parameter_table()?;

    println!("Config OK: {}", path);
    println!();
    println!("  Initial stress:  {}", config.engine.initial_stress);
    println!(
        "  Decay:           (stress / {})^(duration / {})",
        config.decay.scale, config.decay.horizon
    );
    println!("  Worker threads:  {}", config.batch.worker_threads);
    println!("  Event types:     {}", table.len());
    for (event_type, c) in table.iter() {
        println!("    {:<12} adds={:<10} mults={}", event_type, c.adds, c.mults);
    }
    Ok(())
}

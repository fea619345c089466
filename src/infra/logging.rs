//! Structured logging infrastructure.
//!
//! Logging is set up once by the binary (or any embedding host) through
//! [`init_logging`]. The library itself only emits `tracing` events under the
//! component targets in [`targets`] and never installs a subscriber.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `stress_chart::engine` | Per-run simulation results and failures |
//! | `stress_chart::batch` | Multi-subject batch runs |
//! | `stress_chart::config` | Configuration loading and validation |
//! | `stress_chart::cli` | Command-line driver |
//!
//! # Example Usage
//!
//! ```bash
//! # Per-run debug output for the engine only
//! RUST_LOG=warn,stress_chart::engine=debug stress_chart simulate --input events.json
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    /// Parse a CLI-style format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Base level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files (if multi-stream enabled)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Write separate operational / diagnostic / error files
    #[serde(default)]
    pub enable_multi_stream: bool,

    /// Enable stdout logging (default: true)
    #[serde(default = "default_enable_stdout")]
    pub enable_stdout: bool,

    /// Format for stdout logging
    #[serde(default)]
    pub stdout_format: LogFormat,

    /// Optional single log file path.
    /// When set, logs JSON to this file and stdout instead of multi-stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_enable_stdout() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: default_log_dir(),
            enable_multi_stream: false,
            enable_stdout: default_enable_stdout(),
            stdout_format: LogFormat::default(),
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Multi-stream JSON files under `log_dir`.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_multi_stream: true,
            stdout_format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Single JSON log file alongside stdout.
    pub fn with_log_file(log_file: String) -> Self {
        Self {
            log_file: Some(log_file),
            ..Default::default()
        }
    }
}

/// Initialize the global subscriber.
///
/// Returns the `WorkerGuard`s of any non-blocking file writers; they must stay
/// alive for the rest of the program or buffered lines are lost.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let base_filter = match env_filter_override {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?,
    };

    if config.enable_multi_stream {
        std::fs::create_dir_all(&config.log_dir)?;

        // Operational log (config level, all components)
        let operational_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "stress-operational.log");
        let (operational_writer, guard) = tracing_appender::non_blocking(operational_appender);
        guards.push(guard);
        let operational_layer = fmt::layer()
            .with_writer(operational_writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::try_new(&config.level)?);

        // Diagnostic log (per-run engine and batch detail)
        let diagnostic_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "stress-diagnostic.log");
        let (diagnostic_writer, guard) = tracing_appender::non_blocking(diagnostic_appender);
        guards.push(guard);
        let diagnostic_layer = fmt::layer()
            .with_writer(diagnostic_writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::try_new(format!(
                "{}=debug,{}=debug",
                targets::ENGINE,
                targets::BATCH
            ))?);

        // Error log (WARN+)
        let error_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "stress-errors.log");
        let (error_writer, guard) = tracing_appender::non_blocking(error_appender);
        guards.push(guard);
        let error_layer = fmt::layer()
            .with_writer(error_writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::try_new("warn")?);

        let registry = tracing_subscriber::registry()
            .with(operational_layer)
            .with(diagnostic_layer)
            .with(error_layer);

        if config.enable_stdout {
            match config.stdout_format {
                LogFormat::Json => registry
                    .with(fmt::layer().json().with_filter(base_filter))
                    .init(),
                LogFormat::Compact => registry
                    .with(fmt::layer().compact().with_filter(base_filter))
                    .init(),
                LogFormat::Pretty => registry
                    .with(fmt::layer().with_target(false).with_filter(base_filter))
                    .init(),
            }
        } else {
            registry.init();
        }

        eprintln!("Multi-stream logging enabled: {}", config.log_dir.display());
    } else if let Some(ref log_file) = config.log_file {
        // Single file mode - JSON on both sinks keeps the layer types aligned
        let file = std::fs::File::create(log_file)?;
        let file = std::sync::Mutex::new(file);

        tracing_subscriber::registry()
            .with(base_filter)
            .with(fmt::layer().json())
            .with(fmt::layer().with_writer(file).with_ansi(false).json())
            .init();

        eprintln!("Logging to file: {}", log_file);
    } else {
        match config.stdout_format {
            LogFormat::Json => tracing_subscriber::fmt()
                .with_env_filter(base_filter)
                .json()
                .init(),
            LogFormat::Compact => tracing_subscriber::fmt()
                .with_env_filter(base_filter)
                .compact()
                .init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(base_filter)
                .with_target(false)
                .init(),
        }
    }

    Ok(guards)
}

/// Log target constants for component-specific logging.
///
/// ```ignore
/// tracing::debug!(target: targets::ENGINE, events = n, "Trajectory simulated");
/// ```
pub mod targets {
    /// Per-run simulation
    pub const ENGINE: &str = "stress_chart::engine";
    /// Multi-subject batch runs
    pub const BATCH: &str = "stress_chart::batch";
    /// Configuration loading
    pub const CONFIG: &str = "stress_chart::config";
    /// Command-line driver
    pub const CLI: &str = "stress_chart::cli";
}

//! Application configuration.
//!
//! Loaded from a TOML file with every section optional:
//!
//! ```toml
//! [engine]
//! initial_stress = 0.0
//! # parameters_file = "mapping.json"   # columnar {types, adds, mults}
//!
//! [decay]
//! scale = 1.5
//! horizon = 1000.0
//!
//! [parameters]
//! A = { adds = 2.0, mults = 0.5 }
//!
//! [batch]
//! worker_threads = 0
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{DECAY_HORIZON, DECAY_SCALE, DEFAULT_INITIAL_STRESS};
use crate::errors::ConfigError;
use crate::infra::logging::{targets, LogConfig};
use crate::trajectory::{
    BatchConfig, ParameterColumns, ParameterTable, PowerDecay, SpikeCoefficients,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub parameters: ParameterTable,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    /// Stress a run starts from when the input doesn't say
    #[serde(default = "default_initial_stress")]
    pub initial_stress: f64,
    /// Columnar JSON parameter table; replaces `[parameters]` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_file: Option<PathBuf>,
}

fn default_initial_stress() -> f64 {
    DEFAULT_INITIAL_STRESS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_stress: default_initial_stress(),
            parameters_file: None,
        }
    }
}

/// Constants of the power decay rule.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct DecayConfig {
    #[serde(default = "default_decay_scale")]
    pub scale: f64,
    #[serde(default = "default_decay_horizon")]
    pub horizon: f64,
}

fn default_decay_scale() -> f64 {
    DECAY_SCALE
}

fn default_decay_horizon() -> f64 {
    DECAY_HORIZON
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            scale: default_decay_scale(),
            horizon: default_decay_horizon(),
        }
    }
}

impl DecayConfig {
    pub fn to_rule(&self) -> Result<PowerDecay, ConfigError> {
        PowerDecay::new(self.scale, self.horizon)
    }
}

impl AppConfig {
    /// Read `path`, or fall back to defaults when the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                target: targets::CONFIG,
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(
            target: targets::CONFIG,
            path = %path.display(),
            inline_types = config.parameters.len(),
            "Config loaded"
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Config used by `generate-config`: defaults plus one example type.
    pub fn sample() -> Self {
        let parameters = ParameterTable::new([("A", SpikeCoefficients::new(2.0, 0.5))])
            .unwrap_or_default();
        Self {
            parameters,
            ..Default::default()
        }
    }

    /// Check every section that can't be checked while deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decay.to_rule()?;
        if !self.engine.initial_stress.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "engine.initial_stress must be finite, got {}",
                self.engine.initial_stress
            )));
        }
        self.parameter_table()?;
        Ok(())
    }

    /// The table runs should use: the columnar file when configured,
    /// otherwise the inline `[parameters]` section.
    pub fn parameter_table(&self) -> Result<ParameterTable, ConfigError> {
        match &self.engine.parameters_file {
            Some(path) => load_parameter_columns(path),
            None => Ok(self.parameters.clone()),
        }
    }
}

/// Load a columnar `{ "types": [...], "adds": [...], "mults": [...] }` table.
pub fn load_parameter_columns(path: impl AsRef<Path>) -> Result<ParameterTable, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let columns: ParameterColumns = serde_json::from_str(&content)?;
    ParameterTable::from_columns(&columns)
}

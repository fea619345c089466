use thiserror::Error;

/// Why a run's input was rejected before any update rule ran.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrecheckReason {
    #[error("offsets ({offsets}) and types ({types}) differ in length")]
    LengthMismatch { offsets: usize, types: usize },
    #[error("initial stress {value} is not finite")]
    NonFiniteInitialStress { value: f64 },
    #[error("offset {value} at index {index} is not a finite non-negative number")]
    InvalidOffset { index: usize, value: f64 },
    #[error("offset {current} at index {index} precedes previous offset {previous}")]
    DecreasingOffset {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Errors that abort a single simulation run.
///
/// No partial trajectory accompanies any of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Input rejected before the update loop started
    #[error("Precheck failed: {0}")]
    Precheck(PrecheckReason),

    /// Event type tag missing from the parameter table
    #[error("Unknown event type '{event_type}' at index {index}")]
    Lookup { index: usize, event_type: String },

    /// Decay produced an undefined real (negative base, fractional exponent)
    #[error("Decay undefined at index {index}: stress {stress}, duration {duration}")]
    Domain {
        index: usize,
        stress: f64,
        duration: f64,
    },

    /// Spike produced a non-finite value
    #[error("Spike '{event_type}' at index {index} is non-finite from stress {stress}")]
    SpikeDomain {
        index: usize,
        stress: f64,
        event_type: String,
    },
}

impl From<PrecheckReason> for SimulationError {
    fn from(reason: PrecheckReason) -> Self {
        SimulationError::Precheck(reason)
    }
}

/// Configuration and parameter table errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("TOML error: {0}")]
    Toml(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Parameter columns differ in length: types={types}, adds={adds}, mults={mults}")]
    ColumnLength {
        types: usize,
        adds: usize,
        mults: usize,
    },
    #[error("Duplicate event type '{0}' in parameter table")]
    DuplicateType(String),
    #[error("Invalid event type '{0}' in parameter table")]
    InvalidType(String),
    #[error("Non-finite coefficient for event type '{event_type}': adds={adds}, mults={mults}")]
    NonFiniteCoefficient {
        event_type: String,
        adds: f64,
        mults: f64,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Invalid decay constants: scale={scale}, horizon={horizon}")]
    InvalidDecay { scale: f64, horizon: f64 },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Toml(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e.to_string())
    }
}

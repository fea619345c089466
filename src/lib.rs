#![deny(unreachable_pub)]

//! Event-driven stress trajectories.
//!
//! A subject's stress decays with the time elapsed between events and jumps
//! by a type-specific rule whenever a spiking event occurs. [`simulate`] walks
//! one subject's events in order; [`simulate_batch`] runs many independent
//! subjects across a worker pool.

// Core modules
pub mod consts;
mod errors;

// Feature modules
pub mod config;
pub mod infra;
pub mod trajectory;

// Re-exports
pub use config::{AppConfig, DecayConfig, EngineConfig};
pub use errors::{ConfigError, PrecheckReason, SimulationError};
pub use trajectory::{
    simulate, simulate_batch, simulate_columns, simulate_columns_with, simulate_with, BatchConfig,
    BatchOutcome, BatchRunner, DecayContext, Event, ParameterColumns, ParameterTable, PowerDecay,
    SpikeCoefficients, SpikeContext, StepKind, SubjectEvents, TableSpike, Trajectory,
    TrajectoryColumns, TrajectoryPoint, UpdateRule,
};

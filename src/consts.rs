/// Divisor applied to stress before exponentiation in the power decay rule.
pub const DECAY_SCALE: f64 = 1.5;

/// Offset span over which one full power of the scaled stress is applied.
pub const DECAY_HORIZON: f64 = 1000.0;

/// Reserved type tag meaning "no spike, pure decay" in columnar input.
pub const NO_EVENT: &str = "NA";

/// Default stress value a run starts from.
pub const DEFAULT_INITIAL_STRESS: f64 = 0.0;

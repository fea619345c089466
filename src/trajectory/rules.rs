//! Decay and spike update rules.
//!
//! Both rules share one seam, [`UpdateRule`], parameterised by the context the
//! engine hands to each call. A rule carries its own arguments (decay
//! constants, spike coefficient table) so the engine never routes an argument
//! bundle to the wrong rule: the decay rule can only ever see a
//! [`DecayContext`] and the spike rule a [`SpikeContext`].
//!
//! Callers may substitute either rule with any closure of the matching shape.

use crate::consts::{DECAY_HORIZON, DECAY_SCALE};
use crate::errors::{ConfigError, SimulationError};

use super::params::ParameterTable;

/// A stress transition applied by the engine.
pub trait UpdateRule<C> {
    /// Map the current stress to the next one.
    fn apply(&self, stress: f64, ctx: &C) -> Result<f64, SimulationError>;
}

impl<C, F> UpdateRule<C> for F
where
    F: Fn(f64, &C) -> Result<f64, SimulationError>,
{
    fn apply(&self, stress: f64, ctx: &C) -> Result<f64, SimulationError> {
        self(stress, ctx)
    }
}

/// Per-call input of a decay rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayContext {
    /// Position of the event in the run
    pub index: usize,
    /// Offset elapsed since the previous event (never negative)
    pub duration: f64,
}

/// Per-call input of a spike rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeContext<'a> {
    /// Position of the event in the run
    pub index: usize,
    /// Type tag of the spiking event
    pub event_type: &'a str,
}

/// Power-law decay: `(stress / scale)^(duration / horizon)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerDecay {
    scale: f64,
    horizon: f64,
}

impl Default for PowerDecay {
    fn default() -> Self {
        Self {
            scale: DECAY_SCALE,
            horizon: DECAY_HORIZON,
        }
    }
}

impl PowerDecay {
    /// Build a decay rule with non-default constants.
    ///
    /// Both constants must be finite and strictly positive.
    pub fn new(scale: f64, horizon: f64) -> Result<Self, ConfigError> {
        if !(scale.is_finite() && scale > 0.0 && horizon.is_finite() && horizon > 0.0) {
            return Err(ConfigError::InvalidDecay { scale, horizon });
        }
        Ok(Self { scale, horizon })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Raw formula. `0^0` evaluates to 1, and a negative base with a
    /// fractional exponent yields NaN; [`UpdateRule::apply`] turns the latter
    /// into a domain error.
    #[inline]
    pub fn decay(&self, stress: f64, duration: f64) -> f64 {
        (stress / self.scale).powf(duration / self.horizon)
    }
}

impl UpdateRule<DecayContext> for PowerDecay {
    fn apply(&self, stress: f64, ctx: &DecayContext) -> Result<f64, SimulationError> {
        let value = self.decay(stress, ctx.duration);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(SimulationError::Domain {
                index: ctx.index,
                stress,
                duration: ctx.duration,
            })
        }
    }
}

/// Table-driven spike: `(stress + adds) * mults` with coefficients looked up
/// by event type.
#[derive(Debug, Clone, Copy)]
pub struct TableSpike<'t> {
    table: &'t ParameterTable,
}

impl<'t> TableSpike<'t> {
    pub fn new(table: &'t ParameterTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t ParameterTable {
        self.table
    }
}

impl<'a, 't> UpdateRule<SpikeContext<'a>> for TableSpike<'t> {
    fn apply(&self, stress: f64, ctx: &SpikeContext<'a>) -> Result<f64, SimulationError> {
        let c = self.table.lookup(ctx.index, ctx.event_type)?;
        let value = (stress + c.adds) * c.mults;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(SimulationError::SpikeDomain {
                index: ctx.index,
                stress,
                event_type: ctx.event_type.to_string(),
            })
        }
    }
}

/// Default decay formula with the built-in constants.
pub fn decay(stress: f64, duration: f64) -> f64 {
    PowerDecay::default().decay(stress, duration)
}

/// Spike `stress` by the coefficients `table` holds for `event_type`.
pub fn spike(stress: f64, event_type: &str, table: &ParameterTable) -> Result<f64, SimulationError> {
    TableSpike::new(table).apply(
        stress,
        &SpikeContext {
            index: 0,
            event_type,
        },
    )
}

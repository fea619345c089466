//! Trajectory engine - the sequential stress update loop.
//!
//! # The Loop
//! ```text
//! stress ← s₀, prev ← 0
//! for each event i:
//!     d ← offset_i − prev
//!     no type:  base_i ← decay(stress, d)                 (not committed)
//!     type τ:   stress ← decay(stress, d); base_i ← stress
//!               stress ← spike(stress, τ); spike_i ← stress
//!     prev ← offset_i
//! ```
//!
//! Pure-decay steps only observe what the carried stress would decay to; the
//! accumulator moves on spike steps alone. Each step depends on the previous
//! one, so a run is a fold and stays on one thread.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::SimulationError;
use crate::infra::logging::targets;

use super::event::{events_from_columns, precheck, Event};
use super::params::ParameterTable;
use super::rules::{DecayContext, PowerDecay, SpikeContext, TableSpike, UpdateRule};

/// Which transition a step took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Decay observed, carried stress untouched
    Decaying,
    /// Decay then spike, both committed
    Spiked,
}

/// One output record per input event.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TrajectoryPoint {
    pub offset: f64,
    /// Stress right after decay for this step
    pub base_stress: f64,
    /// Stress right after the spike rule, spike steps only
    pub spike_stress: Option<f64>,
}

impl TrajectoryPoint {
    pub fn kind(&self) -> StepKind {
        if self.spike_stress.is_some() {
            StepKind::Spiked
        } else {
            StepKind::Decaying
        }
    }
}

/// Columnar view of a trajectory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrajectoryColumns {
    pub offsets: Vec<f64>,
    pub stress: Vec<f64>,
    pub stress_spikes: Vec<Option<f64>>,
}

/// Full result of one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
    /// Carried stress after the last event
    final_stress: f64,
}

impl Trajectory {
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TrajectoryPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectoryPoint> {
        self.points.iter()
    }

    /// Carried stress once every event is processed (the initial stress when
    /// no spike occurred).
    pub fn final_stress(&self) -> f64 {
        self.final_stress
    }

    pub fn spike_count(&self) -> usize {
        self.points.iter().filter(|p| p.spike_stress.is_some()).count()
    }

    pub fn to_columns(&self) -> TrajectoryColumns {
        let n = self.points.len();
        let mut columns = TrajectoryColumns {
            offsets: Vec::with_capacity(n),
            stress: Vec::with_capacity(n),
            stress_spikes: Vec::with_capacity(n),
        };
        for p in &self.points {
            columns.offsets.push(p.offset);
            columns.stress.push(p.base_stress);
            columns.stress_spikes.push(p.spike_stress);
        }
        columns
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectoryPoint;
    type IntoIter = std::slice::Iter<'a, TrajectoryPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Simulate with the built-in power decay and table spike rules.
pub fn simulate(
    events: &[Event],
    initial_stress: f64,
    table: &ParameterTable,
) -> Result<Trajectory, SimulationError> {
    simulate_with(
        events,
        initial_stress,
        &PowerDecay::default(),
        &TableSpike::new(table),
    )
}

/// Simulate from parallel offset and type-tag columns.
///
/// Mismatched column lengths fail before any rule runs.
pub fn simulate_columns<S: AsRef<str>>(
    offsets: &[f64],
    types: &[S],
    initial_stress: f64,
    table: &ParameterTable,
) -> Result<Trajectory, SimulationError> {
    simulate_columns_with(
        offsets,
        types,
        initial_stress,
        &PowerDecay::default(),
        &TableSpike::new(table),
    )
}

/// Columnar form of [`simulate_with`].
pub fn simulate_columns_with<T, D, S>(
    offsets: &[f64],
    types: &[T],
    initial_stress: f64,
    decay: &D,
    spike: &S,
) -> Result<Trajectory, SimulationError>
where
    T: AsRef<str>,
    D: UpdateRule<DecayContext>,
    S: for<'a> UpdateRule<SpikeContext<'a>>,
{
    let events = events_from_columns(offsets, types)?;
    simulate_with(&events, initial_stress, decay, spike)
}

/// Simulate with caller-supplied decay and spike rules.
pub fn simulate_with<'e, D, S>(
    events: &'e [Event],
    initial_stress: f64,
    decay: &D,
    spike: &S,
) -> Result<Trajectory, SimulationError>
where
    D: UpdateRule<DecayContext>,
    S: UpdateRule<SpikeContext<'e>>,
{
    let result =
        precheck(events, initial_stress).and_then(|()| run(events, initial_stress, decay, spike));

    match &result {
        Ok(trajectory) => debug!(
            target: targets::ENGINE,
            events = trajectory.len(),
            spikes = trajectory.spike_count(),
            initial_stress,
            final_stress = trajectory.final_stress(),
            "Trajectory simulated"
        ),
        Err(e) => warn!(
            target: targets::ENGINE,
            events = events.len(),
            error = %e,
            "Trajectory simulation failed"
        ),
    }
    result
}

fn run<'e, D, S>(
    events: &'e [Event],
    initial_stress: f64,
    decay: &D,
    spike: &S,
) -> Result<Trajectory, SimulationError>
where
    D: UpdateRule<DecayContext>,
    S: UpdateRule<SpikeContext<'e>>,
{
    let mut points = Vec::with_capacity(events.len());
    let mut stress = initial_stress;
    let mut prev_offset = 0.0;

    for (index, event) in events.iter().enumerate() {
        let decay_ctx = DecayContext {
            index,
            duration: event.offset - prev_offset,
        };

        let point = match event.event_type.as_deref() {
            None => TrajectoryPoint {
                offset: event.offset,
                base_stress: decay.apply(stress, &decay_ctx)?,
                spike_stress: None,
            },
            Some(event_type) => {
                stress = decay.apply(stress, &decay_ctx)?;
                let base_stress = stress;
                stress = spike.apply(stress, &SpikeContext { index, event_type })?;
                TrajectoryPoint {
                    offset: event.offset,
                    base_stress,
                    spike_stress: Some(stress),
                }
            }
        };
        points.push(point);

        prev_offset = event.offset;
    }

    Ok(Trajectory {
        points,
        final_stress: stress,
    })
}

//! Cross-component tests for the trajectory engine.

use std::cell::{Cell, RefCell};

use proptest::prelude::*;

use super::*;
use crate::errors::{PrecheckReason, SimulationError};

fn make_table() -> ParameterTable {
    ParameterTable::new([
        ("A", SpikeCoefficients::new(2.0, 0.5)),
        ("B", SpikeCoefficients::new(0.5, 1.8)),
        ("C", SpikeCoefficients::new(4.0, 0.9)),
    ])
    .unwrap()
}

/// Decay rule that records every call and returns the stress unchanged.
#[derive(Default)]
struct RecordingDecay {
    calls: RefCell<Vec<(f64, DecayContext)>>,
}

impl UpdateRule<DecayContext> for RecordingDecay {
    fn apply(&self, stress: f64, ctx: &DecayContext) -> Result<f64, SimulationError> {
        self.calls.borrow_mut().push((stress, *ctx));
        Ok(stress)
    }
}

/// Spike rule that records every call and adds one.
#[derive(Default)]
struct RecordingSpike {
    calls: RefCell<Vec<(f64, usize, String)>>,
}

impl<'a> UpdateRule<SpikeContext<'a>> for RecordingSpike {
    fn apply(&self, stress: f64, ctx: &SpikeContext<'a>) -> Result<f64, SimulationError> {
        self.calls
            .borrow_mut()
            .push((stress, ctx.index, ctx.event_type.to_string()));
        Ok(stress + 1.0)
    }
}

/// Rule that only counts invocations.
#[derive(Default)]
struct CountingRule {
    calls: Cell<usize>,
}

impl UpdateRule<DecayContext> for CountingRule {
    fn apply(&self, stress: f64, _ctx: &DecayContext) -> Result<f64, SimulationError> {
        self.calls.set(self.calls.get() + 1);
        Ok(stress)
    }
}

impl<'a> UpdateRule<SpikeContext<'a>> for CountingRule {
    fn apply(&self, stress: f64, _ctx: &SpikeContext<'a>) -> Result<f64, SimulationError> {
        self.calls.set(self.calls.get() + 1);
        Ok(stress)
    }
}

#[test]
fn test_reference_scenario_columns() {
    let table = ParameterTable::new([("A", SpikeCoefficients::new(2.0, 0.5))]).unwrap();
    let trajectory = simulate_columns(&[0.0, 1000.0], &["NA", "A"], 10.0, &table).unwrap();
    let columns = trajectory.to_columns();

    assert_eq!(columns.stress[0], 1.0);
    assert!((columns.stress[1] - 6.6667).abs() < 1e-4);
    assert!((columns.stress_spikes[1].unwrap() - 4.3333).abs() < 1e-4);
    assert!((trajectory.final_stress() - 4.3333).abs() < 1e-4);
}

#[test]
fn test_length_mismatch_never_invokes_rules() {
    let decay = CountingRule::default();
    let spike = CountingRule::default();

    let result = simulate_columns_with(&[0.0, 1.0, 2.0], &["A", "NA"], 1.0, &decay, &spike);

    assert_eq!(
        result,
        Err(SimulationError::Precheck(PrecheckReason::LengthMismatch {
            offsets: 3,
            types: 2
        }))
    );
    assert_eq!(decay.calls.get(), 0);
    assert_eq!(spike.calls.get(), 0);
}

#[test]
fn test_decreasing_offsets_never_invoke_rules() {
    let decay = CountingRule::default();
    let spike = CountingRule::default();
    let events = vec![Event::spike(0.0, "A"), Event::decay(9.0), Event::spike(3.0, "A")];

    let result = simulate_with(&events, 1.0, &decay, &spike);

    assert!(matches!(
        result,
        Err(SimulationError::Precheck(PrecheckReason::DecreasingOffset { index: 2, .. }))
    ));
    assert_eq!(decay.calls.get(), 0);
    assert_eq!(spike.calls.get(), 0);
}

#[test]
fn test_each_rule_receives_its_own_arguments() {
    let decay = RecordingDecay::default();
    let spike = RecordingSpike::default();
    let events = vec![
        Event::decay(100.0),
        Event::spike(300.0, "B"),
        Event::decay(300.0),
        Event::spike(1000.0, "A"),
    ];

    let trajectory = simulate_with(&events, 5.0, &decay, &spike).unwrap();

    // Decay sees elapsed durations for every event, spike only sees type tags
    // of spiking events.
    let decay_calls = decay.calls.borrow();
    let durations: Vec<f64> = decay_calls.iter().map(|(_, c)| c.duration).collect();
    let indices: Vec<usize> = decay_calls.iter().map(|(_, c)| c.index).collect();
    assert_eq!(durations, vec![100.0, 200.0, 0.0, 700.0]);
    assert_eq!(indices, vec![0, 1, 2, 3]);

    let spike_calls = spike.calls.borrow();
    assert_eq!(
        *spike_calls,
        vec![(5.0, 1, "B".to_string()), (6.0, 3, "A".to_string())]
    );
    assert_eq!(trajectory.final_stress(), 7.0);
}

#[test]
fn test_decay_steps_see_pre_step_stress() {
    let decay = RecordingDecay::default();
    let spike = RecordingSpike::default();
    let events = vec![
        Event::spike(0.0, "A"),
        Event::decay(1.0),
        Event::decay(2.0),
        Event::spike(3.0, "A"),
        Event::decay(4.0),
    ];

    simulate_with(&events, 0.0, &decay, &spike).unwrap();

    let stresses: Vec<f64> = decay.calls.borrow().iter().map(|(s, _)| *s).collect();
    assert_eq!(stresses, vec![0.0, 1.0, 1.0, 1.0, 2.0]);
}

#[test]
fn test_closure_rules() {
    let events = vec![Event::decay(10.0), Event::spike(20.0, "X")];
    let linear_decay = |stress: f64, ctx: &DecayContext| -> Result<f64, SimulationError> {
        Ok(stress - ctx.duration)
    };
    let doubling = |stress: f64, _ctx: &SpikeContext<'_>| -> Result<f64, SimulationError> {
        Ok(stress * 2.0)
    };

    let trajectory = simulate_with(&events, 100.0, &linear_decay, &doubling).unwrap();
    assert_eq!(trajectory.points()[0].base_stress, 90.0);
    assert_eq!(trajectory.points()[1].base_stress, 90.0);
    assert_eq!(trajectory.points()[1].spike_stress, Some(180.0));
}

#[test]
fn test_trajectory_json_columns() {
    let table = make_table();
    let trajectory = simulate_columns(&[0.0, 500.0], &["NA", "B"], 3.0, &table).unwrap();
    let json = serde_json::to_value(trajectory.to_columns()).unwrap();

    assert_eq!(json["offsets"], serde_json::json!([0.0, 500.0]));
    assert!(json["stress_spikes"][0].is_null());
    assert!(json["stress_spikes"][1].is_number());
}

fn arb_run() -> impl Strategy<Value = (Vec<f64>, Vec<String>, f64)> {
    let step = (0.0_f64..1000.0, prop::sample::select(vec!["NA", "A", "B", "C"]));
    (prop::collection::vec(step, 0..40), 0.0_f64..50.0).prop_map(|(steps, initial)| {
        let mut offset = 0.0;
        let mut offsets = Vec::with_capacity(steps.len());
        let mut types = Vec::with_capacity(steps.len());
        for (gap, tag) in steps {
            offset += gap;
            offsets.push(offset);
            types.push(tag.to_string());
        }
        (offsets, types, initial)
    })
}

proptest! {
    #[test]
    fn prop_length_preserved((offsets, types, initial) in arb_run()) {
        let trajectory = simulate_columns(&offsets, &types, initial, &make_table()).unwrap();
        prop_assert_eq!(trajectory.len(), offsets.len());
        for (point, offset) in trajectory.iter().zip(&offsets) {
            prop_assert_eq!(point.offset, *offset);
        }
    }

    #[test]
    fn prop_matches_stepwise_reference((offsets, types, initial) in arb_run()) {
        let table = make_table();
        let trajectory = simulate_columns(&offsets, &types, initial, &table).unwrap();

        let mut stress = initial;
        let mut prev = 0.0;
        for (i, point) in trajectory.iter().enumerate() {
            let duration = offsets[i] - prev;
            if types[i] == "NA" {
                prop_assert_eq!(point.base_stress, decay(stress, duration));
                prop_assert_eq!(point.spike_stress, None);
            } else {
                let base = decay(stress, duration);
                prop_assert_eq!(point.base_stress, base);
                let spiked = spike(base, &types[i], &table).unwrap();
                prop_assert_eq!(point.spike_stress, Some(spiked));
                stress = spiked;
            }
            prev = offsets[i];
        }
        prop_assert_eq!(trajectory.final_stress(), stress);
    }

    #[test]
    fn prop_decay_only_runs_keep_initial_stress(
        gaps in prop::collection::vec(0.0_f64..5000.0, 0..30),
        initial in 0.0_f64..100.0,
    ) {
        let mut offset = 0.0;
        let events: Vec<Event> = gaps
            .iter()
            .map(|gap| {
                offset += gap;
                Event::decay(offset)
            })
            .collect();

        let trajectory = simulate(&events, initial, &make_table()).unwrap();
        prop_assert_eq!(trajectory.final_stress(), initial);
        prop_assert_eq!(trajectory.spike_count(), 0);
    }

    #[test]
    fn prop_zero_duration_decay_is_one(x in -1e6_f64..1e6) {
        prop_assert_eq!(decay(x, 0.0), 1.0);
    }
}

//! Independent runs for many subjects.
//!
//! Each subject gets its own run and its own carried stress; the only thing
//! the runs share is the read-only parameter table. Runs are spread across a
//! rayon pool, and results come back keyed and ordered by subject so the
//! outcome does not depend on scheduling.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::DEFAULT_INITIAL_STRESS;
use crate::errors::SimulationError;
use crate::infra::logging::targets;

use super::engine::{simulate_columns_with, Trajectory};
use super::params::ParameterTable;
use super::rules::{PowerDecay, TableSpike};

/// Worker pool settings for batch runs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchConfig {
    /// Worker threads.
    /// 0 = rayon's global pool, 1 = run subjects sequentially
    #[serde(default)]
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { worker_threads: 0 }
    }
}

/// Columnar input for one subject.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SubjectEvents {
    pub offsets: Vec<f64>,
    /// Type tags, `"NA"` for pure decay steps
    pub types: Vec<String>,
    /// Overrides the runner's default initial stress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_stress: Option<f64>,
}

/// Per-subject results of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: BTreeMap<String, Result<Trajectory, SimulationError>>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &Trajectory)> {
        self.results
            .iter()
            .filter_map(|(k, r)| r.as_ref().ok().map(|t| (k.as_str(), t)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SimulationError)> {
        self.results
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k.as_str(), e)))
    }
}

/// Runs many subjects against one parameter table.
pub struct BatchRunner {
    decay: PowerDecay,
    default_initial_stress: f64,
    worker_threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl BatchRunner {
    pub fn new(config: &BatchConfig) -> Self {
        let pool = if config.worker_threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(
                        target: targets::BATCH,
                        worker_threads = config.worker_threads,
                        error = %e,
                        "Failed to build worker pool, falling back to global pool"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            decay: PowerDecay::default(),
            default_initial_stress: DEFAULT_INITIAL_STRESS,
            worker_threads: config.worker_threads,
            pool,
        }
    }

    /// Use a decay rule with non-default constants.
    pub fn with_decay(mut self, decay: PowerDecay) -> Self {
        self.decay = decay;
        self
    }

    /// Initial stress for subjects that don't carry their own.
    pub fn with_initial_stress(mut self, initial_stress: f64) -> Self {
        self.default_initial_stress = initial_stress;
        self
    }

    /// Simulate one subject.
    pub fn run_subject(
        &self,
        subject: &SubjectEvents,
        table: &ParameterTable,
    ) -> Result<Trajectory, SimulationError> {
        simulate_columns_with(
            &subject.offsets,
            &subject.types,
            subject.initial_stress.unwrap_or(self.default_initial_stress),
            &self.decay,
            &TableSpike::new(table),
        )
    }

    /// Simulate every subject. A failing subject never affects the others.
    pub fn run(
        &self,
        subjects: &BTreeMap<String, SubjectEvents>,
        table: &ParameterTable,
    ) -> BatchOutcome {
        let results: BTreeMap<String, Result<Trajectory, SimulationError>> =
            if self.worker_threads == 1 {
                subjects
                    .iter()
                    .map(|(key, subject)| (key.clone(), self.run_subject(subject, table)))
                    .collect()
            } else {
                let par_run = || -> BTreeMap<String, Result<Trajectory, SimulationError>> {
                    subjects
                        .par_iter()
                        .map(|(key, subject)| (key.clone(), self.run_subject(subject, table)))
                        .collect()
                };
                match &self.pool {
                    Some(pool) => pool.install(par_run),
                    None => par_run(),
                }
            };

        let outcome = BatchOutcome { results };
        let failed = outcome.failures().count();
        info!(
            target: targets::BATCH,
            subjects = outcome.len(),
            failed,
            "Batch simulated"
        );
        outcome
    }
}

/// Simulate every subject with the default rules.
pub fn simulate_batch(
    subjects: &BTreeMap<String, SubjectEvents>,
    table: &ParameterTable,
    config: &BatchConfig,
) -> BatchOutcome {
    BatchRunner::new(config).run(subjects, table)
}

//! Per-event-type spike coefficients.
//!
//! The table maps an event type tag to the additive and multiplicative
//! coefficients used by the spike rule. It is built once, validated, and only
//! read afterwards, so a single instance can be shared by reference across
//! concurrent runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::NO_EVENT;
use crate::errors::{ConfigError, SimulationError};

/// Coefficients applied by the spike rule: `(stress + adds) * mults`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SpikeCoefficients {
    /// Additive jump applied before scaling
    pub adds: f64,
    /// Multiplicative factor applied after the jump
    pub mults: f64,
}

impl SpikeCoefficients {
    pub fn new(adds: f64, mults: f64) -> Self {
        Self { adds, mults }
    }

    fn is_finite(&self) -> bool {
        self.adds.is_finite() && self.mults.is_finite()
    }
}

/// Columnar form of the table: one row per type, `adds` and `mults` indexed
/// by the `types` column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParameterColumns {
    pub types: Vec<String>,
    pub adds: Vec<f64>,
    pub mults: Vec<f64>,
}

/// Immutable mapping from event type to spike coefficients.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(
    try_from = "BTreeMap<String, SpikeCoefficients>",
    into = "BTreeMap<String, SpikeCoefficients>"
)]
pub struct ParameterTable {
    entries: BTreeMap<String, SpikeCoefficients>,
}

impl ParameterTable {
    /// Build a table from `(type, coefficients)` pairs.
    ///
    /// A type given twice keeps its last coefficients.
    pub fn new<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, SpikeCoefficients)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (event_type, coefficients) in entries {
            let event_type = event_type.into();
            validate_entry(&event_type, &coefficients)?;
            map.insert(event_type, coefficients);
        }
        Ok(Self { entries: map })
    }

    /// Build a table from the columnar form.
    ///
    /// Unlike [`ParameterTable::new`], a type listed twice is an error.
    pub fn from_columns(columns: &ParameterColumns) -> Result<Self, ConfigError> {
        let ParameterColumns { types, adds, mults } = columns;
        if types.len() != adds.len() || types.len() != mults.len() {
            return Err(ConfigError::ColumnLength {
                types: types.len(),
                adds: adds.len(),
                mults: mults.len(),
            });
        }

        let mut map = BTreeMap::new();
        for ((event_type, &a), &m) in types.iter().zip(adds).zip(mults) {
            let coefficients = SpikeCoefficients::new(a, m);
            validate_entry(event_type, &coefficients)?;
            if map.insert(event_type.clone(), coefficients).is_some() {
                return Err(ConfigError::DuplicateType(event_type.clone()));
            }
        }
        Ok(Self { entries: map })
    }

    /// Coefficients for `event_type`, or a lookup error naming the event index.
    pub fn lookup(
        &self,
        index: usize,
        event_type: &str,
    ) -> Result<SpikeCoefficients, SimulationError> {
        self.entries
            .get(event_type)
            .copied()
            .ok_or_else(|| SimulationError::Lookup {
                index,
                event_type: event_type.to_string(),
            })
    }

    pub fn get(&self, event_type: &str) -> Option<&SpikeCoefficients> {
        self.entries.get(event_type)
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpikeCoefficients)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert back to the columnar form (rows in type order).
    pub fn to_columns(&self) -> ParameterColumns {
        let mut columns = ParameterColumns {
            types: Vec::with_capacity(self.len()),
            adds: Vec::with_capacity(self.len()),
            mults: Vec::with_capacity(self.len()),
        };
        for (event_type, c) in &self.entries {
            columns.types.push(event_type.clone());
            columns.adds.push(c.adds);
            columns.mults.push(c.mults);
        }
        columns
    }
}

fn validate_entry(event_type: &str, coefficients: &SpikeCoefficients) -> Result<(), ConfigError> {
    if event_type.is_empty() || event_type == NO_EVENT {
        return Err(ConfigError::InvalidType(event_type.to_string()));
    }
    if !coefficients.is_finite() {
        return Err(ConfigError::NonFiniteCoefficient {
            event_type: event_type.to_string(),
            adds: coefficients.adds,
            mults: coefficients.mults,
        });
    }
    Ok(())
}

impl TryFrom<BTreeMap<String, SpikeCoefficients>> for ParameterTable {
    type Error = ConfigError;

    fn try_from(entries: BTreeMap<String, SpikeCoefficients>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ParameterTable> for BTreeMap<String, SpikeCoefficients> {
    fn from(table: ParameterTable) -> Self {
        table.entries
    }
}

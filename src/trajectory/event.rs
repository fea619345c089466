//! Input events and the up-front validation every run goes through.

use serde::{Deserialize, Serialize};

use crate::consts::NO_EVENT;
use crate::errors::{PrecheckReason, SimulationError};

/// One point in a subject's event sequence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    /// Time offset from the start of the run
    pub offset: f64,
    /// Spike type, or `None` for a pure decay step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl Event {
    /// A pure decay step.
    pub fn decay(offset: f64) -> Self {
        Self {
            offset,
            event_type: None,
        }
    }

    /// A spike step of the given type.
    pub fn spike(offset: f64, event_type: impl Into<String>) -> Self {
        Self {
            offset,
            event_type: Some(event_type.into()),
        }
    }

    /// Build from a columnar tag, mapping the [`NO_EVENT`] sentinel to `None`.
    pub fn from_tag(offset: f64, tag: &str) -> Self {
        if tag == NO_EVENT {
            Self::decay(offset)
        } else {
            Self::spike(offset, tag)
        }
    }

    pub fn is_spike(&self) -> bool {
        self.event_type.is_some()
    }

    /// Columnar tag for this event.
    pub fn tag(&self) -> &str {
        self.event_type.as_deref().unwrap_or(NO_EVENT)
    }
}

/// Zip parallel offset and tag columns into events.
///
/// Columns of different length are rejected before anything else happens.
pub fn events_from_columns<S: AsRef<str>>(
    offsets: &[f64],
    types: &[S],
) -> Result<Vec<Event>, SimulationError> {
    if offsets.len() != types.len() {
        return Err(PrecheckReason::LengthMismatch {
            offsets: offsets.len(),
            types: types.len(),
        }
        .into());
    }
    Ok(offsets
        .iter()
        .zip(types)
        .map(|(&offset, tag)| Event::from_tag(offset, tag.as_ref()))
        .collect())
}

/// Validate a run's input so the update loop can assume non-negative
/// durations and finite operands.
pub(crate) fn precheck(events: &[Event], initial_stress: f64) -> Result<(), SimulationError> {
    if !initial_stress.is_finite() {
        return Err(PrecheckReason::NonFiniteInitialStress {
            value: initial_stress,
        }
        .into());
    }

    // Offsets start at an implicit 0, so the first one must be >= 0 too.
    let mut previous = 0.0_f64;
    for (index, event) in events.iter().enumerate() {
        let current = event.offset;
        if !current.is_finite() || current < 0.0 {
            return Err(PrecheckReason::InvalidOffset {
                index,
                value: current,
            }
            .into());
        }
        if current < previous {
            return Err(PrecheckReason::DecreasingOffset {
                index,
                previous,
                current,
            }
            .into());
        }
        previous = current;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_maps_to_decay() {
        let events = events_from_columns(&[0.0, 5.0], &["NA", "A"]).unwrap();
        assert_eq!(events, vec![Event::decay(0.0), Event::spike(5.0, "A")]);
        assert_eq!(events[0].tag(), NO_EVENT);
        assert!(events[1].is_spike());
    }

    #[test]
    fn test_length_mismatch() {
        let result = events_from_columns(&[0.0, 5.0, 6.0], &["NA", "A"]);
        assert_eq!(
            result,
            Err(SimulationError::Precheck(PrecheckReason::LengthMismatch {
                offsets: 3,
                types: 2
            }))
        );
    }

    #[test]
    fn test_precheck_accepts_ties() {
        let events = vec![Event::decay(0.0), Event::spike(3.0, "A"), Event::decay(3.0)];
        assert!(precheck(&events, 1.0).is_ok());
        assert!(precheck(&[], 0.0).is_ok());
    }

    #[test]
    fn test_precheck_rejects_decreasing() {
        let events = vec![Event::decay(10.0), Event::decay(4.0)];
        assert_eq!(
            precheck(&events, 1.0),
            Err(SimulationError::Precheck(PrecheckReason::DecreasingOffset {
                index: 1,
                previous: 10.0,
                current: 4.0
            }))
        );
    }

    #[test]
    fn test_precheck_rejects_bad_offsets_and_stress() {
        assert!(matches!(
            precheck(&[Event::decay(-1.0)], 0.0),
            Err(SimulationError::Precheck(PrecheckReason::InvalidOffset { index: 0, .. }))
        ));
        assert!(matches!(
            precheck(&[Event::decay(0.0), Event::decay(f64::NAN)], 0.0),
            Err(SimulationError::Precheck(PrecheckReason::InvalidOffset { index: 1, .. }))
        ));
        assert!(matches!(
            precheck(&[], f64::INFINITY),
            Err(SimulationError::Precheck(
                PrecheckReason::NonFiniteInitialStress { .. }
            ))
        ));
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&Event::decay(1.0)).unwrap();
        assert_eq!(json, r#"{"offset":1.0}"#);

        let event: Event = serde_json::from_str(r#"{"offset":2.0,"event_type":"A"}"#).unwrap();
        assert_eq!(event, Event::spike(2.0, "A"));
    }
}

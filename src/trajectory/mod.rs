//! Stress trajectory computation.
//!
//! - **Params**: per-event-type spike coefficients
//! - **Rules**: decay and spike update rules behind one [`UpdateRule`] seam
//! - **Event**: input events, columnar conversion and validation
//! - **Engine**: the sequential update loop producing a [`Trajectory`]
//! - **Batch**: independent runs for many subjects on a worker pool

mod batch;
mod engine;
mod event;
mod params;
mod rules;

#[cfg(test)]
mod tests;

pub use batch::*;
pub use engine::*;
pub use event::{events_from_columns, Event};
pub use params::*;
pub use rules::*;

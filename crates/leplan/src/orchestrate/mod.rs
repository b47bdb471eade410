//! Sequential orchestration of the stage pipeline.

/// Fail-fast pipeline engine and its result bundle.
pub mod engine;
/// Run lifecycle state.
pub mod state;

pub use engine::{SequentialTripPlanner, StepTiming, TripPlan};
pub use state::{RunState, RunStatus};

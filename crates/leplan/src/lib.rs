#![warn(missing_docs)]

//! leplan - sequential 5-agent trip planning with per-step tracing and evaluation.
//!
//! A [`PlanningState`] is threaded through five stages in a fixed order. Each
//! stage writes exactly one field through [`PlanningState::record_step`] and
//! reports a [`TraceRecord`] to the [`ObservabilityRecorder`], which scores it
//! into an [`EvaluationRecord`]. [`SequentialTripPlanner`] drives the pipeline
//! fail-fast and exports both logs as JSON.

/// Agent contract and stage identities.
pub mod agent;
/// The five stage agents and the ordered pipeline.
pub mod agents;
/// Run-level error type.
pub mod error;
/// Telemetry documents and console summary.
pub mod export;
/// Per-step traces and evaluations.
pub mod observe;
/// Planner options.
pub mod options;
/// Orchestrator and run lifecycle.
pub mod orchestrate;
/// User trip preferences.
pub mod preferences;
/// Orchestrator event sinks.
pub mod sink;
/// Shared planning state.
pub mod state;

pub use agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
pub use agents::{Pipeline, PipelineAgent};
pub use error::PlanError;
pub use export::{
    render_summary, write_exports, ExportArtifacts, ExportError, ExportPaths, FormatMode,
};
pub use observe::{
    EvaluationRecord, ObservabilityExport, ObservabilityRecorder, ScoringPolicy, TraceRecord,
};
pub use options::PlanOptions;
pub use orchestrate::{RunState, RunStatus, SequentialTripPlanner, StepTiming, TripPlan};
pub use preferences::TripPreferences;
pub use sink::{LogSink, MemorySink, NullSink, PlanEvent, TracingSink};
pub use state::{PlanningState, StageField, StageValue, StateError, StateView};

/// Plan a trip with the standard pipeline, reporting through `tracing`.
pub fn plan_trip(
    destination: impl Into<String>,
    preferences: TripPreferences,
    options: PlanOptions,
) -> Result<TripPlan, PlanError> {
    SequentialTripPlanner::new(options).plan_trip(destination, preferences)
}

use crate::agent::AgentExecutionError;
use crate::export::{ExportArtifacts, ExportError};
use thiserror::Error;

/// Failure of a whole planning run.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A stage failed; the run stopped there.
    #[error(
        "step {step}/{total} ({agent_id}) failed after {completed} completed step(s): {source}"
    )]
    StepFailed {
        /// Failing agent.
        agent_id: String,
        /// 1-based failing step.
        step: usize,
        /// Pipeline length.
        total: usize,
        /// Steps that completed before the failure.
        completed: usize,
        /// Telemetry accumulated before the failure, and where it was written.
        partial_export: Box<ExportArtifacts>,
        /// Underlying agent failure.
        #[source]
        source: AgentExecutionError,
    },

    /// The pipeline's stage list cannot run.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// Writing telemetry after a completed run failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PlanError {
    /// 1-based failing step, if the run stopped at a stage.
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Partial telemetry carried by a step failure.
    pub fn partial_export(&self) -> Option<&ExportArtifacts> {
        match self {
            Self::StepFailed { partial_export, .. } => Some(&**partial_export),
            _ => None,
        }
    }
}

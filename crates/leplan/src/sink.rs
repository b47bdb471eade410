//! Injectable destination for orchestrator progress events.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Lifecycle event emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A run began.
    RunStarted {
        /// Run identifier.
        run_id: String,
        /// Trip destination.
        destination: String,
        /// Number of stages in the pipeline.
        total: usize,
    },
    /// A stage is about to execute.
    StepStarted {
        /// 1-based step.
        step: usize,
        /// Number of stages.
        total: usize,
        /// Stage agent id.
        agent_id: String,
    },
    /// A stage returned and honored its contract.
    StepCompleted {
        /// 1-based step.
        step: usize,
        /// Number of stages.
        total: usize,
        /// Stage agent id.
        agent_id: String,
        /// Wall time of the step.
        duration_ms: f64,
        /// Size of the stage output.
        output_length: usize,
    },
    /// A stage failed.
    StepFailed {
        /// 1-based step.
        step: usize,
        /// Number of stages.
        total: usize,
        /// Stage agent id.
        agent_id: String,
        /// Rendered failure.
        error: String,
    },
    /// Both telemetry documents were written.
    ExportWritten {
        /// Trace document path.
        traces: PathBuf,
        /// Evaluation document path.
        evaluations: PathBuf,
    },
    /// Every stage completed.
    RunCompleted {
        /// Run identifier.
        run_id: String,
        /// Completed step count.
        steps: usize,
    },
    /// The run stopped at a failing step.
    RunFailed {
        /// Run identifier.
        run_id: String,
        /// 1-based failing step.
        step: usize,
        /// Steps completed before the failure.
        completed: usize,
    },
}

/// Receiver of orchestrator events.
pub trait LogSink {
    /// Handle one event.
    fn emit(&self, event: &PlanEvent);
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn emit(&self, event: &PlanEvent) {
        (**self).emit(event);
    }
}

/// Forwards events to `tracing`. Installing a subscriber is the caller's job.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: &PlanEvent) {
        match event {
            PlanEvent::RunStarted {
                run_id,
                destination,
                total,
            } => info!("Starting trip planning for {destination} ({total} steps, run {run_id})"),
            PlanEvent::StepStarted {
                step,
                total,
                agent_id,
            } => info!("[STEP {step}/{total}] {agent_id}"),
            PlanEvent::StepCompleted {
                agent_id,
                duration_ms,
                output_length,
                ..
            } => debug!("{agent_id} completed in {duration_ms:.1}ms ({output_length} chars)"),
            PlanEvent::StepFailed {
                step,
                total,
                agent_id,
                error,
            } => warn!("[STEP {step}/{total}] {agent_id} failed: {error}"),
            PlanEvent::ExportWritten {
                traces,
                evaluations,
            } => info!(
                "Exported traces to {} and evaluations to {}",
                traces.display(),
                evaluations.display()
            ),
            PlanEvent::RunCompleted { run_id, steps } => {
                info!("Trip planning complete: {steps} steps (run {run_id})")
            }
            PlanEvent::RunFailed {
                run_id,
                step,
                completed,
            } => warn!("Trip planning failed at step {step} after {completed} completed (run {run_id})"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PlanEvent>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: &PlanEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _event: &PlanEvent) {}
}

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentExecutionError, AgentKind, AgentOutput};
use crate::agents::Pipeline;
use crate::error::PlanError;
use crate::export::{write_exports, ExportArtifacts, ExportPaths};
use crate::observe::ObservabilityRecorder;
use crate::options::PlanOptions;
use crate::preferences::TripPreferences;
use crate::sink::{LogSink, PlanEvent, TracingSink};
use crate::state::PlanningState;

use super::state::RunState;

/// Wall time of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    /// Stage agent id.
    pub agent_id: String,
    /// 1-based step.
    pub step: usize,
    /// Elapsed milliseconds, including the contract check.
    pub duration_ms: f64,
}

/// Result bundle of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    /// Short run identifier.
    pub run_id: String,
    /// Trip destination.
    pub destination: String,
    /// Preferences the run used.
    pub preferences: TripPreferences,
    /// Stage outputs joined by blank lines.
    pub response: String,
    /// Agent ids in completion order.
    pub execution_order: Vec<String>,
    /// Final planning state.
    pub state: PlanningState,
    /// Per-step wall time.
    pub step_timings: Vec<StepTiming>,
    /// Telemetry and the files it was written to.
    pub exports: ExportArtifacts,
}

/// Runs the pipeline stage by stage, fail-fast.
pub struct SequentialTripPlanner<S: LogSink = TracingSink> {
    /// Lifecycle state of the latest run.
    pub run_state: RunState,
    pipeline: Pipeline,
    options: PlanOptions,
    sink: S,
}

impl Default for SequentialTripPlanner<TracingSink> {
    fn default() -> Self {
        Self::new(PlanOptions::default())
    }
}

impl SequentialTripPlanner<TracingSink> {
    /// Standard pipeline reporting through `tracing`.
    pub fn new(options: PlanOptions) -> Self {
        Self::with_sink(options, TracingSink)
    }
}

impl<S: LogSink> SequentialTripPlanner<S> {
    /// Standard pipeline reporting to `sink`.
    pub fn with_sink(options: PlanOptions, sink: S) -> Self {
        Self {
            run_state: RunState::default(),
            pipeline: Pipeline::standard(),
            options: options.normalized(),
            sink,
        }
    }

    /// Replace the stage list.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Stage list in effect.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Plan one trip.
    ///
    /// Each call starts from a fresh state and recorder. On a stage failure the
    /// run stops, telemetry gathered so far is exported (when enabled) and the
    /// error names the failing step.
    pub fn plan_trip(
        &mut self,
        destination: impl Into<String>,
        preferences: TripPreferences,
    ) -> Result<TripPlan, PlanError> {
        let started_at = Utc::now();
        let mut state = PlanningState::initialize(destination, preferences);
        let mut recorder = ObservabilityRecorder::new(self.options.scoring);
        let run_id = run_id(&state, started_at);
        let total = self.pipeline.len();

        self.run_state.begin(run_id.clone(), total);
        self.sink.emit(&PlanEvent::RunStarted {
            run_id: run_id.clone(),
            destination: state.destination.clone(),
            total,
        });

        let mut outputs: Vec<AgentOutput> = Vec::with_capacity(total);
        let mut step_timings = Vec::with_capacity(total);
        let mut failure: Option<(usize, AgentKind, AgentExecutionError)> = None;

        for (index, agent) in self.pipeline.iter().enumerate() {
            let step = index + 1;
            let kind = agent.kind();
            self.run_state.advance(step);
            self.sink.emit(&PlanEvent::StepStarted {
                step,
                total,
                agent_id: kind.id().to_string(),
            });

            let order_before = state.execution_order.len();
            let traces_before = recorder.traces().len();
            let started = Instant::now();
            let outcome = match agent.execute(&mut state, &mut recorder) {
                Ok(output) => verify_contract(kind, &state, &recorder, order_before, traces_before)
                    .map(|()| output),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(output) => {
                    let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
                    self.run_state.complete_step(kind.id());
                    self.sink.emit(&PlanEvent::StepCompleted {
                        step,
                        total,
                        agent_id: kind.id().to_string(),
                        duration_ms,
                        output_length: output.value.output_length(),
                    });
                    step_timings.push(StepTiming {
                        agent_id: kind.id().to_string(),
                        step,
                        duration_ms,
                    });
                    outputs.push(output);
                }
                Err(err) => {
                    self.sink.emit(&PlanEvent::StepFailed {
                        step,
                        total,
                        agent_id: kind.id().to_string(),
                        error: err.to_string(),
                    });
                    failure = Some((step, kind, err));
                    break;
                }
            }
        }

        if let Some((step, kind, source)) = failure {
            let completed = self.run_state.completed_steps.len();
            self.run_state.fail(step, source.to_string());
            let paths = self.export_partial(&recorder);
            self.sink.emit(&PlanEvent::RunFailed {
                run_id,
                step,
                completed,
            });
            return Err(PlanError::StepFailed {
                agent_id: kind.id().to_string(),
                step,
                total,
                completed,
                partial_export: Box::new(ExportArtifacts {
                    paths,
                    telemetry: recorder.export(),
                }),
                source,
            });
        }

        let paths = if self.options.write_exports {
            let paths = write_exports(&recorder, &self.options).map_err(|err| {
                self.run_state.last_error = Some(err.to_string());
                err
            })?;
            self.emit_export(&paths);
            Some(paths)
        } else {
            None
        };

        self.sink.emit(&PlanEvent::RunCompleted {
            run_id: run_id.clone(),
            steps: outputs.len(),
        });

        let response = outputs
            .iter()
            .map(|output| output.value.render())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(TripPlan {
            run_id,
            destination: state.destination.clone(),
            preferences: state.preferences.clone(),
            response,
            execution_order: state.execution_order.clone(),
            state,
            step_timings,
            exports: ExportArtifacts {
                paths,
                telemetry: recorder.export(),
            },
        })
    }

    fn export_partial(&self, recorder: &ObservabilityRecorder) -> Option<ExportPaths> {
        if !self.options.write_exports {
            return None;
        }
        match write_exports(recorder, &self.options) {
            Ok(paths) => {
                self.emit_export(&paths);
                Some(paths)
            }
            Err(err) => {
                tracing::warn!("Partial telemetry export failed: {err}");
                None
            }
        }
    }

    fn emit_export(&self, paths: &ExportPaths) {
        self.sink.emit(&PlanEvent::ExportWritten {
            traces: paths.traces.clone(),
            evaluations: paths.evaluations.clone(),
        });
    }
}

/// Check that a returned step left exactly one order entry and one trace,
/// both under its own id, and filled its owned field.
fn verify_contract(
    kind: AgentKind,
    state: &PlanningState,
    recorder: &ObservabilityRecorder,
    order_before: usize,
    traces_before: usize,
) -> Result<(), AgentExecutionError> {
    let agent_id = kind.id();
    let violation = |detail: String| AgentExecutionError::ContractViolation {
        agent_id: agent_id.to_string(),
        detail,
    };

    let new_entries = state
        .execution_order
        .get(order_before..)
        .unwrap_or_default();
    if new_entries.len() != 1 || new_entries[0] != agent_id {
        return Err(violation(format!(
            "expected one record_step as {agent_id}, saw {new_entries:?}"
        )));
    }

    let new_traces = recorder.traces().get(traces_before..).unwrap_or_default();
    if new_traces.len() != 1 || new_traces[0].agent_id != agent_id {
        return Err(violation(format!(
            "expected one trace, saw {}",
            new_traces.len()
        )));
    }

    if state.field(kind.owned_field()).is_none() {
        return Err(violation(format!(
            "owned field '{}' left empty",
            kind.owned_field()
        )));
    }

    Ok(())
}

fn run_id(state: &PlanningState, started_at: DateTime<Utc>) -> String {
    let preferences = serde_json::to_string(&state.preferences).unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(state.destination.as_bytes());
    hasher.update(&[0]);
    hasher.update(preferences.as_bytes());
    hasher.update(&[0]);
    hasher.update(started_at.to_rfc3339().as_bytes());
    hasher.finalize().to_hex().to_string()[..12].to_string()
}

use super::record::{EvaluationRecord, ObservabilityExport, TraceRecord};
use super::scoring::ScoringPolicy;
use crate::agent::AgentKind;
use crate::state::{StageValue, StateSnapshot};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::debug;

/// Run-scoped sink for traces and evaluations.
///
/// Both logs are append-only. Malformed input is replaced by defaults so
/// observability can never abort a run.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityRecorder {
    policy: ScoringPolicy,
    traces: Vec<TraceRecord>,
    evaluations: Vec<EvaluationRecord>,
}

impl ObservabilityRecorder {
    /// Create an empty recorder using `policy` for evaluations.
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            policy: policy.normalized(),
            traces: Vec::new(),
            evaluations: Vec::new(),
        }
    }

    /// Scoring policy in effect.
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Build and append a trace for one step, then evaluate it.
    #[allow(clippy::too_many_arguments)]
    pub fn log_trace(
        &mut self,
        agent_id: &str,
        input_summary: &str,
        output: Option<&StageValue>,
        tools_used: Option<Vec<String>>,
        duration_ms: f64,
        state_before: &StateSnapshot,
        state_after: &StateSnapshot,
    ) -> TraceRecord {
        let state_delta = state_after
            .populated
            .difference(&state_before.populated)
            .copied()
            .collect();

        let tools_used: BTreeSet<String> = tools_used
            .unwrap_or_default()
            .into_iter()
            .map(|tool| tool.trim().to_string())
            .filter(|tool| !tool.is_empty())
            .collect();

        let trace = TraceRecord {
            agent_id: agent_id.to_string(),
            input_summary: input_summary.to_string(),
            output_length: output.map(StageValue::output_length).unwrap_or(0),
            tools_used,
            state_delta,
            timestamp: Utc::now(),
            duration_ms: sanitize_duration(duration_ms),
        };

        debug!(
            "Trace: {} - Tools: {:?} - delta: {:?}",
            trace.agent_id, trace.tools_used, trace.state_delta
        );
        self.traces.push(trace.clone());
        self.evaluate(agent_id, &trace, state_after);
        trace
    }

    /// Score one trace and append the evaluation.
    pub fn evaluate(
        &mut self,
        agent_id: &str,
        trace: &TraceRecord,
        state_after: &StateSnapshot,
    ) -> EvaluationRecord {
        let owned = AgentKind::from_id(agent_id).map(AgentKind::owned_field);

        let completion_rate = match owned {
            Some(field) if state_after.non_empty.contains(&field) => 1.0,
            _ => 0.0,
        };

        let state_consistency = match owned {
            Some(field) => trace.state_delta.len() == 1 && trace.state_delta.contains(&field),
            None => false,
        };

        let evaluation = EvaluationRecord {
            agent_id: agent_id.to_string(),
            completion_rate,
            response_time_ms: trace.duration_ms,
            quality_score: self.policy.quality_score(trace.output_length),
            tool_effectiveness: self.policy.tool_effectiveness(trace.tools_used.len()),
            state_consistency,
        };

        debug!("Evaluation: {}", evaluation);
        self.evaluations.push(evaluation.clone());
        evaluation
    }

    /// Trace log so far.
    pub fn traces(&self) -> &[TraceRecord] {
        &self.traces
    }

    /// Evaluation log so far.
    pub fn evaluations(&self) -> &[EvaluationRecord] {
        &self.evaluations
    }

    /// Copy of both logs. Never drains, so repeated calls agree.
    pub fn export(&self) -> ObservabilityExport {
        ObservabilityExport {
            traces: self.traces.clone(),
            evaluations: self.evaluations.clone(),
        }
    }
}

fn sanitize_duration(duration_ms: f64) -> f64 {
    if duration_ms.is_finite() && duration_ms > 0.0 {
        duration_ms
    } else {
        0.0
    }
}

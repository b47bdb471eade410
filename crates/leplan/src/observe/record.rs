use crate::state::StageField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One agent invocation as observed by the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Agent identifier.
    pub agent_id: String,
    /// What the state looked like on entry.
    pub input_summary: String,
    /// Size metric of the produced output.
    pub output_length: usize,
    /// External capabilities exercised.
    pub tools_used: BTreeSet<String>,
    /// Stage fields newly populated by this step.
    pub state_delta: BTreeSet<StageField>,
    /// When the trace was recorded.
    pub timestamp: DateTime<Utc>,
    /// Step wall time.
    pub duration_ms: f64,
}

/// Scores for one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Agent identifier.
    pub agent_id: String,
    /// 1.0 when the owned field is non-empty after the step.
    pub completion_rate: f64,
    /// Copied from the trace duration.
    pub response_time_ms: f64,
    /// Length-based quality in [0, 1].
    pub quality_score: f64,
    /// 1.0 when any tool was used, otherwise the configured default.
    pub tool_effectiveness: f64,
    /// True iff the delta is exactly the owned field.
    pub state_consistency: bool,
}

impl fmt::Display for EvaluationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Agent Evaluation: {}", self.agent_id)?;
        writeln!(f, "- Task Completion: {:.1}%", self.completion_rate * 100.0)?;
        writeln!(f, "- Info Quality: {:.1}%", self.quality_score * 100.0)?;
        writeln!(f, "- Response Time: {:.0}ms", self.response_time_ms)?;
        writeln!(f, "- Tool Effectiveness: {:.1}%", self.tool_effectiveness * 100.0)?;
        write!(f, "- State Consistency: {}", self.state_consistency)
    }
}

/// Both logs of a run, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityExport {
    /// Trace log.
    pub traces: Vec<TraceRecord>,
    /// Evaluation log.
    pub evaluations: Vec<EvaluationRecord>,
}

impl ObservabilityExport {
    /// Encode the trace log as a pretty JSON array.
    pub fn encode_traces(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.traces)
    }

    /// Encode the evaluation log as a pretty JSON array.
    pub fn encode_evaluations(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.evaluations)
    }

    /// Decode a trace document produced by [`Self::encode_traces`].
    pub fn decode_traces(document: &str) -> serde_json::Result<Vec<TraceRecord>> {
        serde_json::from_str(document)
    }

    /// Decode an evaluation document produced by [`Self::encode_evaluations`].
    pub fn decode_evaluations(document: &str) -> serde_json::Result<Vec<EvaluationRecord>> {
        serde_json::from_str(document)
    }

    /// Mean quality score, 0.0 when empty.
    pub fn mean_quality(&self) -> f64 {
        mean(self.evaluations.iter().map(|e| e.quality_score))
    }

    /// Mean completion rate, 0.0 when empty.
    pub fn mean_completion(&self) -> f64 {
        mean(self.evaluations.iter().map(|e| e.completion_rate))
    }

    /// Evaluation paired with `agent_id`, if any.
    pub fn evaluation_for(&self, agent_id: &str) -> Option<&EvaluationRecord> {
        self.evaluations.iter().find(|e| e.agent_id == agent_id)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

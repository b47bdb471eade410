use crate::export::FormatMode;
use crate::observe::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default trace export file name.
pub const DEFAULT_TRACE_FILE: &str = "trip_traces.json";
/// Default evaluation export file name.
pub const DEFAULT_EVALUATION_FILE: &str = "trip_evaluations.json";

/// Execution options for one planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    /// Directory receiving the two export documents.
    pub export_dir: PathBuf,
    /// Trace document file name.
    pub trace_file: String,
    /// Evaluation document file name.
    pub evaluation_file: String,
    /// Write exports to disk; telemetry is always kept in memory.
    pub write_exports: bool,
    /// Evaluation scoring knobs.
    pub scoring: ScoringPolicy,
    /// Console summary mode.
    pub mode: FormatMode,
    /// Max console summary characters.
    pub max_summary_chars: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
            trace_file: DEFAULT_TRACE_FILE.to_string(),
            evaluation_file: DEFAULT_EVALUATION_FILE.to_string(),
            write_exports: true,
            scoring: ScoringPolicy::default(),
            mode: FormatMode::Balanced,
            max_summary_chars: FormatMode::Balanced.default_max_chars(),
        }
    }
}

impl PlanOptions {
    /// Repair degenerate values.
    pub fn normalized(mut self) -> Self {
        if self.max_summary_chars == 0 {
            self.max_summary_chars = self.mode.default_max_chars();
        }

        if self.trace_file.trim().is_empty() {
            self.trace_file = DEFAULT_TRACE_FILE.to_string();
        }

        if self.evaluation_file.trim().is_empty() {
            self.evaluation_file = DEFAULT_EVALUATION_FILE.to_string();
        }

        if self.export_dir.as_os_str().is_empty() {
            self.export_dir = PathBuf::from(".");
        }

        self.scoring = self.scoring.normalized();
        self
    }

    /// Full path of the trace document.
    pub fn trace_path(&self) -> PathBuf {
        self.export_dir.join(&self.trace_file)
    }

    /// Full path of the evaluation document.
    pub fn evaluation_path(&self) -> PathBuf {
        self.export_dir.join(&self.evaluation_file)
    }
}

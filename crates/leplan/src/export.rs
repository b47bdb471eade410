//! Telemetry documents and the console summary.

use crate::observe::{ObservabilityExport, ObservabilityRecorder};
use crate::options::PlanOptions;
use crate::orchestrate::TripPlan;
use crate::state::StageField;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Detail level of the console summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// Pipeline order and scores only.
    Ultra,
    /// Adds stage sizes and the response.
    #[default]
    Balanced,
    /// Adds a scorecard per agent.
    Verbose,
}

impl FormatMode {
    /// Parse a mode name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ultra" => Some(Self::Ultra),
            "balanced" => Some(Self::Balanced),
            "verbose" => Some(Self::Verbose),
            _ => None,
        }
    }

    /// Summary character budget used when none is configured.
    pub fn default_max_chars(self) -> usize {
        match self {
            Self::Ultra => 2_000,
            Self::Balanced => 8_000,
            Self::Verbose => 24_000,
        }
    }

    fn shows_details(self) -> bool {
        self != Self::Ultra
    }

    fn shows_scorecards(self) -> bool {
        self == Self::Verbose
    }
}

/// Failure writing telemetry documents.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure.
    #[error("failed to encode telemetry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the two documents landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPaths {
    /// Trace document.
    pub traces: PathBuf,
    /// Evaluation document.
    pub evaluations: PathBuf,
}

/// Telemetry of a run plus the files it was written to, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifacts {
    /// Written paths; `None` when exports are disabled or writing failed.
    pub paths: Option<ExportPaths>,
    /// In-memory copy of both logs.
    pub telemetry: ObservabilityExport,
}

/// Write both documents under `options.export_dir`, creating it if needed.
///
/// Pure read of the recorder; calling twice rewrites identical content.
pub fn write_exports(
    recorder: &ObservabilityRecorder,
    options: &PlanOptions,
) -> Result<ExportPaths, ExportError> {
    let telemetry = recorder.export();
    let traces = telemetry.encode_traces()?;
    let evaluations = telemetry.encode_evaluations()?;

    std::fs::create_dir_all(&options.export_dir).map_err(|source| ExportError::Io {
        path: options.export_dir.clone(),
        source,
    })?;

    let paths = ExportPaths {
        traces: options.trace_path(),
        evaluations: options.evaluation_path(),
    };
    write_document(&paths.traces, &traces)?;
    write_document(&paths.evaluations, &evaluations)?;
    Ok(paths)
}

fn write_document(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Console summary of a completed plan.
pub fn render_summary(plan: &TripPlan, mode: FormatMode, max_chars: usize) -> String {
    let telemetry = &plan.exports.telemetry;
    let mut out = String::new();

    let _ = writeln!(out, "Trip plan for {} (run {})", plan.destination, plan.run_id);
    let _ = writeln!(out, "Pipeline: {}", plan.execution_order.join(" -> "));
    let _ = writeln!(out);

    let _ = writeln!(out, "Steps:");
    for timing in &plan.step_timings {
        let scores = telemetry
            .evaluation_for(&timing.agent_id)
            .map(|e| {
                format!(
                    "quality {:.2} | tools {:.2} | consistent {}",
                    e.quality_score,
                    e.tool_effectiveness,
                    if e.state_consistency { "yes" } else { "no" }
                )
            })
            .unwrap_or_else(|| "no evaluation".to_string());
        let _ = writeln!(
            out,
            "  {}. {:<28} {:>8.1}ms  {}",
            timing.step, timing.agent_id, timing.duration_ms, scores
        );
    }
    let _ = writeln!(
        out,
        "Average quality {:.2}, completion {:.0}%",
        telemetry.mean_quality(),
        telemetry.mean_completion() * 100.0
    );

    if mode.shows_details() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Stage sizes:");
        for field in StageField::ALL {
            let size = plan
                .state
                .field(field)
                .map(|value| value.output_length())
                .unwrap_or(0);
            let _ = writeln!(out, "  {:<16} {size} chars", field.name());
        }
    }

    if mode.shows_scorecards() {
        for evaluation in &telemetry.evaluations {
            let _ = writeln!(out);
            let _ = writeln!(out, "{evaluation}");
        }
    }

    if let Some(paths) = &plan.exports.paths {
        let _ = writeln!(out);
        let _ = writeln!(out, "Traces exported to {}", paths.traces.display());
        let _ = writeln!(out, "Evaluations exported to {}", paths.evaluations.display());
    }

    if mode.shows_details() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", plan.response);
    }

    clip_summary(out.trim_end(), max_chars)
}

/// Keep whole lines within `max_chars` and note how many lines were dropped.
fn clip_summary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(index, _)| index);
    let head = &text[..cut];
    let head = match head.rfind('\n') {
        Some(end) if end > 0 => &head[..end],
        _ => head,
    };
    let dropped = text[head.len()..]
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();

    format!("{}\n… [{dropped} more line(s) truncated]", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StageValue, StateSnapshot};
    use rstest::rstest;
    use tempfile::tempdir;

    fn recorder_with_one_trace() -> ObservabilityRecorder {
        let mut recorder = ObservabilityRecorder::default();
        recorder.log_trace(
            "Agent1_ResearchDestination",
            "Destination: Oslo",
            Some(&StageValue::from("fjords")),
            Some(vec!["search".to_string()]),
            3.0,
            &StateSnapshot::default(),
            &StateSnapshot {
                populated: [StageField::Research].into_iter().collect(),
                non_empty: [StageField::Research].into_iter().collect(),
            },
        );
        recorder
    }

    #[test]
    fn write_exports_creates_directory_and_both_documents() {
        let dir = tempdir().expect("tempdir");
        let options = PlanOptions {
            export_dir: dir.path().join("nested/out"),
            ..PlanOptions::default()
        };

        let paths = write_exports(&recorder_with_one_trace(), &options).expect("export");

        let traces = std::fs::read_to_string(&paths.traces).expect("traces");
        let evaluations = std::fs::read_to_string(&paths.evaluations).expect("evals");
        assert_eq!(ObservabilityExport::decode_traces(&traces).expect("decode").len(), 1);
        assert_eq!(
            ObservabilityExport::decode_evaluations(&evaluations)
                .expect("decode")
                .len(),
            1
        );
    }

    #[test]
    fn repeated_exports_are_byte_identical() {
        let dir = tempdir().expect("tempdir");
        let options = PlanOptions {
            export_dir: dir.path().to_path_buf(),
            ..PlanOptions::default()
        };
        let recorder = recorder_with_one_trace();

        let first = write_exports(&recorder, &options).expect("first");
        let first_bytes = std::fs::read(&first.traces).expect("read");
        let second = write_exports(&recorder, &options).expect("second");
        let second_bytes = std::fs::read(&second.traces).expect("read");

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn io_error_names_the_path() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").expect("write");

        let options = PlanOptions {
            export_dir: blocker.join("inner"),
            ..PlanOptions::default()
        };
        let err = write_exports(&recorder_with_one_trace(), &options).expect_err("must fail");
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(err.to_string().contains("blocker"));
    }

    #[rstest]
    #[case("ULTRA", Some(FormatMode::Ultra))]
    #[case(" balanced ", Some(FormatMode::Balanced))]
    #[case("verbose", Some(FormatMode::Verbose))]
    #[case("loud", None)]
    fn format_mode_parses_names(#[case] raw: &str, #[case] mode: Option<FormatMode>) {
        assert_eq!(FormatMode::parse(raw), mode);
    }

    #[test]
    fn clip_summary_keeps_short_text() {
        assert_eq!(clip_summary("Steps:\n  1. research", 100), "Steps:\n  1. research");
    }

    #[test]
    fn clip_summary_cuts_on_line_boundaries() {
        let text = "Trip plan for Oslo\nPipeline: a -> b\nSteps:\n  1. a\n  2. b";
        let clipped = clip_summary(text, 30);
        assert!(clipped.starts_with("Trip plan for Oslo\n…"));
        assert!(clipped.ends_with("[4 more line(s) truncated]"));
    }

    #[test]
    fn clip_summary_respects_char_boundaries_in_long_lines() {
        let clipped = clip_summary("東京東京東京", 2);
        assert!(clipped.starts_with("東京\n"));
        assert!(clipped.ends_with("[1 more line(s) truncated]"));
    }
}

//! Per-step tracing and evaluation.

/// Trace and evaluation record schemas.
pub mod record;
/// Append-only recorder.
pub mod recorder;
/// Evaluation scoring knobs.
pub mod scoring;

pub use record::{EvaluationRecord, ObservabilityExport, TraceRecord};
pub use recorder::ObservabilityRecorder;
pub use scoring::ScoringPolicy;

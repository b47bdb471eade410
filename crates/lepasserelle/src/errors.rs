// Error Handling
//
// *La Gestion des Erreurs* (The Error Management) - CLI error types and user-facing messages

use leplan::{ExportError, PlanError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors raised by the command-line layer
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
        /// How to fix it
        suggestion: Option<String>,
    },

    /// Malformed preference flags
    #[error("Invalid preference: {message}")]
    Preference {
        /// What went wrong
        message: String,
        /// How to fix it
        suggestion: Option<String>,
    },

    /// Unreadable or malformed telemetry documents
    #[error("Report error: {message}")]
    Report {
        /// What went wrong
        message: String,
        /// Offending file
        path: Option<PathBuf>,
    },

    /// The planning run failed
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),
}

impl CliError {
    /// Create a config error
    pub fn config_error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        CliError::Config {
            message: message.into(),
            suggestion,
        }
    }

    /// Create a preference error
    pub fn preference_error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        CliError::Preference {
            message: message.into(),
            suggestion,
        }
    }

    /// Create a report error
    pub fn report_error(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CliError::Report {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Get user-friendly suggestion for recovery
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Config { suggestion, .. } => suggestion.clone(),
            CliError::Preference { suggestion, .. } => suggestion.clone(),
            CliError::Report { .. } => Some(
                "Pass the trip_traces.json and trip_evaluations.json files written by `levoyage plan`"
                    .to_string(),
            ),
            CliError::Plan(plan) => plan_suggestion(plan),
        }
    }
}

fn plan_suggestion(error: &PlanError) -> Option<String> {
    match error {
        PlanError::StepFailed { partial_export, .. } => match &partial_export.paths {
            Some(paths) => Some(format!(
                "Partial telemetry was saved; inspect it with `levoyage report {} {}`",
                paths.traces.display(),
                paths.evaluations.display()
            )),
            None => Some("Re-run without --no-export to keep partial telemetry".to_string()),
        },
        PlanError::Export(ExportError::Io { .. }) => Some(
            "Check that the export directory is writable, or pass --no-export".to_string(),
        ),
        PlanError::Export(ExportError::Encode(_)) | PlanError::InvalidPipeline(_) => None,
    }
}

/// Format error for user display
pub fn format_error(error: &CliError) -> String {
    let mut message = format!("Error: {}", error);

    if let Some(suggestion) = error.suggestion() {
        message.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    if let CliError::Report { path: Some(p), .. } = error {
        message.push_str(&format!("\n\nPath: {:?}", p));
    }

    message
}

/// Format any error reaching `main`, with suggestions when the cause is known
pub fn format_anyhow(error: &anyhow::Error) -> String {
    if let Some(cli) = error.downcast_ref::<CliError>() {
        return format_error(cli);
    }
    if let Some(plan) = error.downcast_ref::<PlanError>() {
        let mut message = format!("Error: {}", plan);
        if let Some(suggestion) = plan_suggestion(plan) {
            message.push_str(&format!("\n\nSuggestion: {}", suggestion));
        }
        return message;
    }
    format!("Error: {:#}", error)
}

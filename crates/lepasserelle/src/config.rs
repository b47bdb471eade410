// Planner Configuration
//
// *La Configuration* (The Configuration) - Project settings for LeVoyage

use anyhow::{Context, Result};
use leplan::options::{DEFAULT_EVALUATION_FILE, DEFAULT_TRACE_FILE};
use leplan::{FormatMode, PlanOptions, ScoringPolicy, TripPreferences};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration directory, relative to the project
pub const CONFIG_DIR: &str = ".levoyage";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".levoyage/config.toml";

/// Environment variable overriding the export directory
pub const ENV_EXPORT_DIR: &str = "LEVOYAGE_EXPORT_DIR";

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "LEVOYAGE_LOG_LEVEL";

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    /// Telemetry export settings
    pub export: ExportConfig,

    /// Evaluation scoring knobs
    pub scoring: ScoringPolicy,

    /// Console output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Preferences applied when not given on the command line
    pub defaults: TripPreferences,
}

impl PlannerConfig {
    /// Load configuration from a project directory
    ///
    /// Looks for `.levoyage/config.toml` in the project directory.
    /// If not found, returns default configuration.
    pub fn load<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let config_path = project_path.as_ref().join(DEFAULT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(PlannerConfig::default());
        }

        Self::load_from_file(&config_path)
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: PlannerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        Ok(config)
    }

    /// Save configuration under a project directory
    ///
    /// Creates `.levoyage` if it doesn't exist. Returns the written path.
    pub fn save<P: AsRef<Path>>(&self, project_path: P) -> Result<PathBuf> {
        let config_path = project_path.as_ref().join(DEFAULT_CONFIG_FILE);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to an explicit file
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(config_path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Apply `LEVOYAGE_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `LEVOYAGE_*` overrides from an arbitrary lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_EXPORT_DIR).filter(|v| !v.trim().is_empty()) {
            self.export.dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    /// Planner options described by this configuration
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            export_dir: self.export.dir.clone(),
            trace_file: self.export.trace_file.clone(),
            evaluation_file: self.export.evaluation_file.clone(),
            write_exports: self.export.enabled,
            scoring: self.scoring,
            mode: self.output.mode,
            max_summary_chars: self.output.max_chars,
        }
        .normalized()
    }
}

/// Telemetry export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Write the trace and evaluation documents
    pub enabled: bool,

    /// Directory receiving both documents
    pub dir: PathBuf,

    /// Trace document file name
    pub trace_file: String,

    /// Evaluation document file name
    pub evaluation_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            trace_file: DEFAULT_TRACE_FILE.to_string(),
            evaluation_file: DEFAULT_EVALUATION_FILE.to_string(),
        }
    }
}

/// Console output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Summary detail level
    pub mode: FormatMode,

    /// Summary character budget (0 = mode default)
    pub max_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: FormatMode::Balanced,
            max_chars: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Also append log lines to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert!(config.export.enabled);
        assert_eq!(config.export.trace_file, "trip_traces.json");
        assert_eq!(config.scoring.quality_threshold, 300);
        assert_eq!(config.logging.level, "info");
        assert!(config.defaults.is_empty());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = PlannerConfig::load(dir.path()).expect("load");
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_config_roundtrip_with_defaults_section() {
        let dir = tempdir().expect("tempdir");
        let mut config = PlannerConfig::default();
        config.output.mode = FormatMode::Verbose;
        config.logging.file = Some(PathBuf::from("trip_planning_trace.log"));
        config.defaults.budget = Some("budget".to_string());
        config.defaults.interests = vec!["food".to_string(), "history".to_string()];
        config
            .defaults
            .apply_assignment("travelers=2")
            .expect("assignment");

        let path = config.save(dir.path()).expect("save");
        assert!(path.ends_with(DEFAULT_CONFIG_FILE));

        let loaded = PlannerConfig::load(dir.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[scoring]\nquality_threshold = 120\n\n[output]\nmode = \"ultra\"\n",
        )
        .expect("write");

        let config = PlannerConfig::load_from_file(&path).expect("load");
        assert_eq!(config.scoring.quality_threshold, 120);
        assert_eq!(config.scoring.default_tool_effectiveness, 0.5);
        assert_eq!(config.output.mode, FormatMode::Ultra);
        assert!(config.export.enabled);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[output\nmode = ").expect("write");

        let err = PlannerConfig::load_from_file(&path).expect_err("must fail");
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_EXPORT_DIR, "/tmp/levoyage-out"),
            (ENV_LOG_LEVEL, "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = PlannerConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.export.dir, PathBuf::from("/tmp/levoyage-out"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_plan_options_are_normalized() {
        let mut config = PlannerConfig::default();
        config.output.mode = FormatMode::Ultra;
        config.export.enabled = false;

        let options = config.plan_options();
        assert!(!options.write_exports);
        assert_eq!(
            options.max_summary_chars,
            FormatMode::Ultra.default_max_chars()
        );
    }
}

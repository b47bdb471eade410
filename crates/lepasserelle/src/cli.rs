// CLI Interface
//
// This module provides the command-line interface for LeVoyage.

use crate::config::{LoggingConfig, PlannerConfig, CONFIG_DIR, DEFAULT_CONFIG_FILE};
use crate::console::ConsoleSink;
use crate::errors::{CliError, Result};
use anyhow::{Context, Result as AnyhowResult};
use clap::{Args, Parser, Subcommand};
use leplan::{
    render_summary, FormatMode, ObservabilityExport, PlanOptions, SequentialTripPlanner,
    TripPreferences,
};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// File recording the lifecycle of the latest run, under the config directory
pub const LAST_RUN_FILE: &str = "last_run.json";

/// LeVoyage - Sequential Trip Planner
#[derive(Parser, Debug)]
#[command(name = "levoyage")]
#[command(author = "LeVoyage Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan trips with a sequential five-agent pipeline and export per-step telemetry", long_about = None)]
pub struct Cli {
    /// Path to the project directory (holds .levoyage/)
    #[arg(global = true, long = "project", short = 'p')]
    pub project_path: Option<PathBuf>,

    /// Explicit configuration file
    #[arg(global = true, long = "config", short = 'c')]
    pub config_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the five-agent pipeline for a destination
    Plan(PlanArgs),

    /// Summarize previously exported trace and evaluation files
    Report {
        /// Trace document (trip_traces.json)
        #[arg(value_name = "TRACES")]
        traces: PathBuf,

        /// Evaluation document (trip_evaluations.json)
        #[arg(value_name = "EVALUATIONS")]
        evaluations: PathBuf,
    },

    /// Manage the configuration file
    Config {
        /// Configuration action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `levoyage plan`
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Trip destination
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// Trip duration, e.g. "5 days"
    #[arg(long = "duration")]
    pub duration: Option<String>,

    /// Budget tier: budget, moderate or luxury
    #[arg(long = "budget")]
    pub budget: Option<String>,

    /// Free-text travel style
    #[arg(long = "style")]
    pub travel_style: Option<String>,

    /// Interest (repeatable, or comma separated)
    #[arg(long = "interest")]
    pub interests: Vec<String>,

    /// Start date
    #[arg(long = "start-date")]
    pub start_date: Option<String>,

    /// Extra preference as key=value (repeatable)
    #[arg(long = "pref", value_name = "KEY=VALUE")]
    pub prefs: Vec<String>,

    /// Directory for the exported telemetry
    #[arg(long = "export-dir")]
    pub export_dir: Option<PathBuf>,

    /// Keep telemetry in memory only
    #[arg(long = "no-export")]
    pub no_export: bool,

    /// Summary mode: ultra, balanced or verbose
    #[arg(long = "mode")]
    pub mode: Option<String>,
}

/// `levoyage config` actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long = "force")]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Run the CLI
    pub fn run(self) -> AnyhowResult<()> {
        let project = get_project_path(self.project_path)?;
        let config_path = self.config_path;

        if let Commands::Config {
            action: ConfigAction::Init { force },
        } = &self.command
        {
            return cmd_config_init_impl(config_path, &project, *force);
        }

        let mut config = match &config_path {
            Some(path) => PlannerConfig::load_from_file(path)?,
            None => PlannerConfig::load(&project)?,
        };
        config.apply_env_overrides();

        init_logging_impl(self.verbose, &config.logging)?;
        debug!("Project directory: {}", project.display());

        match self.command {
            Commands::Plan(args) => cmd_plan_impl(&args, &config, &project),
            Commands::Report {
                traces,
                evaluations,
            } => cmd_report_impl(&traces, &evaluations),
            Commands::Config {
                action: ConfigAction::Show,
            } => {
                let rendered =
                    toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
                println!("{}", rendered);
                Ok(())
            }
            Commands::Config {
                action: ConfigAction::Init { .. },
            } => Ok(()),
        }
    }
}

impl PlanArgs {
    /// Preferences given on the command line, before config defaults
    pub fn preferences(&self) -> Result<TripPreferences> {
        let mut prefs = TripPreferences {
            duration: self.duration.clone(),
            budget: self.budget.clone(),
            travel_style: self.travel_style.clone(),
            interests: self
                .interests
                .iter()
                .flat_map(|raw| raw.split(','))
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            start_date: self.start_date.clone(),
            ..TripPreferences::default()
        };

        for assignment in &self.prefs {
            prefs.apply_assignment(assignment).map_err(|message| {
                CliError::preference_error(
                    message,
                    Some("Use --pref key=value, e.g. --pref travelers=2".to_string()),
                )
            })?;
        }

        Ok(prefs)
    }

    /// Planner options after applying command-line overrides to `config`
    pub fn plan_options(&self, config: &PlannerConfig) -> Result<PlanOptions> {
        let mut options = config.plan_options();

        if let Some(dir) = &self.export_dir {
            options.export_dir = dir.clone();
        }
        if self.no_export {
            options.write_exports = false;
        }
        if let Some(raw) = &self.mode {
            options.mode = FormatMode::parse(raw).ok_or_else(|| {
                CliError::config_error(
                    format!("unknown output mode '{}'", raw),
                    Some("Use ultra, balanced or verbose".to_string()),
                )
            })?;
            if config.output.max_chars == 0 {
                options.max_summary_chars = options.mode.default_max_chars();
            }
        }

        Ok(options)
    }
}

/// Initialize logging implementation
fn init_logging_impl(verbose: bool, logging: &LoggingConfig) -> AnyhowResult<()> {
    let directive = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;

            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }

    Ok(())
}

/// Get project path from explicit path or current directory
fn get_project_path(explicit: Option<PathBuf>) -> AnyhowResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

/// Plan command implementation
fn cmd_plan_impl(args: &PlanArgs, config: &PlannerConfig, project: &Path) -> AnyhowResult<()> {
    let preferences = args.preferences()?.merged_over(&config.defaults);
    let options = args.plan_options(config)?;
    let (mode, max_chars) = (options.mode, options.max_summary_chars);

    let mut planner = SequentialTripPlanner::with_sink(options, ConsoleSink::stdout());
    let outcome = planner.plan_trip(args.destination.clone(), preferences);

    let state_path = project.join(CONFIG_DIR).join(LAST_RUN_FILE);
    if let Err(err) = planner.run_state.save_to_path(&state_path) {
        warn!("Failed to save run state to {}: {}", state_path.display(), err);
    }

    let plan = outcome.map_err(CliError::from)?;
    println!();
    println!("{}", render_summary(&plan, mode, max_chars));
    Ok(())
}

/// Report command implementation
fn cmd_report_impl(traces: &Path, evaluations: &Path) -> AnyhowResult<()> {
    let export = load_export(traces, evaluations)?;
    println!("{}", render_report(&export));
    Ok(())
}

/// Load both telemetry documents
pub fn load_export(traces: &Path, evaluations: &Path) -> Result<ObservabilityExport> {
    let read = |path: &Path| {
        fs::read_to_string(path)
            .map_err(|err| CliError::report_error(format!("cannot read file: {}", err), path))
    };

    let traces_doc = read(traces)?;
    let evaluations_doc = read(evaluations)?;

    Ok(ObservabilityExport {
        traces: ObservabilityExport::decode_traces(&traces_doc).map_err(|err| {
            CliError::report_error(format!("malformed trace document: {}", err), traces)
        })?,
        evaluations: ObservabilityExport::decode_evaluations(&evaluations_doc).map_err(|err| {
            CliError::report_error(format!("malformed evaluation document: {}", err), evaluations)
        })?,
    })
}

/// Per-agent table of a telemetry export
pub fn render_report(export: &ObservabilityExport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<28} {:>10} {:>8} {:>6} {:>8} {:>9} {:>11}",
        "AGENT", "DURATION", "OUTPUT", "TOOLS", "QUALITY", "TOOL-EFF", "CONSISTENT"
    );

    for trace in &export.traces {
        let (quality, tool_eff, consistent) = match export.evaluation_for(&trace.agent_id) {
            Some(e) => (
                format!("{:.2}", e.quality_score),
                format!("{:.2}", e.tool_effectiveness),
                if e.state_consistency { "yes" } else { "no" },
            ),
            None => ("-".to_string(), "-".to_string(), "-"),
        };
        let _ = writeln!(
            out,
            "{:<28} {:>8.1}ms {:>8} {:>6} {:>8} {:>9} {:>11}",
            trace.agent_id,
            trace.duration_ms,
            trace.output_length,
            trace.tools_used.len(),
            quality,
            tool_eff,
            consistent
        );
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "{} trace(s), {} evaluation(s); mean quality {:.2}, completion {:.0}%",
        export.traces.len(),
        export.evaluations.len(),
        export.mean_quality(),
        export.mean_completion() * 100.0
    );
    out
}

/// Config init command implementation
fn cmd_config_init_impl(explicit: Option<PathBuf>, project: &Path, force: bool) -> AnyhowResult<()> {
    let path = explicit.unwrap_or_else(|| project.join(DEFAULT_CONFIG_FILE));

    if path.exists() && !force {
        return Err(CliError::config_error(
            format!("configuration already exists at {}", path.display()),
            Some("Pass --force to overwrite it".to_string()),
        )
        .into());
    }

    PlannerConfig::default().save_to_file(&path)?;
    println!("✓ Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_plan_parsing() {
        let cli = Cli::try_parse_from([
            "levoyage",
            "plan",
            "Tokyo, Japan",
            "--duration",
            "5 days",
            "--budget",
            "moderate",
            "--interest",
            "food,temples",
            "--interest",
            "anime",
            "--pref",
            "travelers=2",
        ])
        .unwrap();

        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.destination, "Tokyo, Japan");
                let prefs = args.preferences().unwrap();
                assert_eq!(prefs.duration.as_deref(), Some("5 days"));
                assert_eq!(prefs.interests, vec!["food", "temples", "anime"]);
                assert_eq!(prefs.extra["travelers"], 2);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["levoyage", "report", "t.json", "e.json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Report { .. }));
    }

    #[test]
    fn test_config_init_parsing() {
        let cli = Cli::try_parse_from(["levoyage", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[rstest]
    #[case("travelers")]
    #[case("=3")]
    #[case(" = value")]
    fn test_bad_pref_is_rejected(#[case] raw: &str) {
        let args = PlanArgs {
            destination: "Rome".to_string(),
            prefs: vec![raw.to_string()],
            ..PlanArgs::default()
        };
        let err = args.preferences().unwrap_err();
        assert!(matches!(err, CliError::Preference { .. }));
    }

    #[rstest]
    #[case("ultra", FormatMode::Ultra)]
    #[case("BALANCED", FormatMode::Balanced)]
    #[case("verbose", FormatMode::Verbose)]
    fn test_mode_override(#[case] raw: &str, #[case] mode: FormatMode) {
        let args = PlanArgs {
            destination: "Rome".to_string(),
            mode: Some(raw.to_string()),
            no_export: true,
            ..PlanArgs::default()
        };
        let options = args.plan_options(&PlannerConfig::default()).unwrap();
        assert_eq!(options.mode, mode);
        assert_eq!(options.max_summary_chars, mode.default_max_chars());
        assert!(!options.write_exports);
    }

    #[rstest]
    #[case("loud")]
    #[case("")]
    fn test_unknown_mode_is_rejected(#[case] raw: &str) {
        let args = PlanArgs {
            destination: "Rome".to_string(),
            mode: Some(raw.to_string()),
            ..PlanArgs::default()
        };
        assert!(args.plan_options(&PlannerConfig::default()).is_err());
    }
}

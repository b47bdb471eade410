// Integration Tests for LePasserelle
//
// These tests cover end-to-end workflows including:
// - CLI command workflows
// - Configuration files
// - Telemetry reports
// - Error handling

use clap::Parser;
use lepasserelle::cli::{load_export, render_report, Cli, LAST_RUN_FILE};
use lepasserelle::config::{PlannerConfig, CONFIG_DIR, DEFAULT_CONFIG_FILE};
use lepasserelle::{format_anyhow, CliError};
use leplan::{RunState, RunStatus};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn run(args: &[&str]) -> anyhow::Result<()> {
    Cli::try_parse_from(args).expect("valid arguments").run()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

// ============================================================================
// CLI WORKFLOW INTEGRATION TESTS
// ============================================================================

mod cli_workflow_tests {
    use super::*;

    #[test]
    fn test_plan_writes_exports_and_run_state() {
        let project = TempDir::new().expect("tempdir");
        let out = project.path().join("out");

        run(&[
            "levoyage",
            "plan",
            "Tokyo, Japan",
            "--duration",
            "5 days",
            "--budget",
            "moderate",
            "--project",
            path_arg(project.path()),
            "--export-dir",
            path_arg(&out),
        ])
        .expect("plan succeeds");

        let export = load_export(
            &out.join("trip_traces.json"),
            &out.join("trip_evaluations.json"),
        )
        .expect("exports readable");
        assert_eq!(export.traces.len(), 5);
        assert_eq!(export.evaluations.len(), 5);
        assert_eq!(export.traces[4].agent_id, "Agent5_BudgetAnalysis");

        let state = RunState::load_from_path(&project.path().join(CONFIG_DIR).join(LAST_RUN_FILE))
            .expect("run state saved");
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.completed_steps.len(), 5);
    }

    #[test]
    fn test_plan_without_export_leaves_no_files() {
        let project = TempDir::new().expect("tempdir");
        let out = project.path().join("out");

        run(&[
            "levoyage",
            "plan",
            "Oslo",
            "--no-export",
            "--mode",
            "ultra",
            "--project",
            path_arg(project.path()),
            "--export-dir",
            path_arg(&out),
        ])
        .expect("plan succeeds");

        assert!(!out.exists());
    }

    #[test]
    fn test_bad_preference_is_reported_with_suggestion() {
        let project = TempDir::new().expect("tempdir");
        let err = run(&[
            "levoyage",
            "plan",
            "Rome",
            "--pref",
            "travelers",
            "--no-export",
            "--project",
            path_arg(project.path()),
        ])
        .expect_err("malformed pref");

        assert!(err.downcast_ref::<CliError>().is_some());
        let message = format_anyhow(&err);
        assert!(message.contains("Invalid preference"));
        assert!(message.contains("--pref key=value"));
    }
}

// ============================================================================
// CONFIGURATION INTEGRATION TESTS
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_init_then_refuse_overwrite() {
        let project = TempDir::new().expect("tempdir");

        run(&["levoyage", "config", "init", "--project", path_arg(project.path())])
            .expect("init");
        let written = project.path().join(DEFAULT_CONFIG_FILE);
        assert_eq!(
            PlannerConfig::load_from_file(&written).expect("load"),
            PlannerConfig::default()
        );

        let err = run(&["levoyage", "config", "init", "--project", path_arg(project.path())])
            .expect_err("exists");
        assert!(format_anyhow(&err).contains("--force"));

        run(&[
            "levoyage",
            "config",
            "init",
            "--force",
            "--project",
            path_arg(project.path()),
        ])
        .expect("forced init");
    }

    #[test]
    fn test_config_defaults_and_export_dir_are_used() {
        let project = TempDir::new().expect("tempdir");
        let out = project.path().join("from-config");

        let mut config = PlannerConfig::default();
        config.export.dir = out.clone();
        config.export.trace_file = "traces.json".to_string();
        config.defaults.budget = Some("luxury".to_string());
        config.save(project.path()).expect("save");

        run(&["levoyage", "plan", "Paris", "--project", path_arg(project.path())])
            .expect("plan succeeds");

        let export = load_export(&out.join("traces.json"), &out.join("trip_evaluations.json"))
            .expect("exports readable");
        assert_eq!(export.traces.len(), 5);
    }
}

// ============================================================================
// REPORT INTEGRATION TESTS
// ============================================================================

mod report_tests {
    use super::*;

    #[test]
    fn test_report_renders_every_agent() {
        let project = TempDir::new().expect("tempdir");
        let out = project.path().join("out");
        run(&[
            "levoyage",
            "plan",
            "Lisbon",
            "--project",
            path_arg(project.path()),
            "--export-dir",
            path_arg(&out),
        ])
        .expect("plan succeeds");

        let traces = out.join("trip_traces.json");
        let evaluations = out.join("trip_evaluations.json");
        let table = render_report(&load_export(&traces, &evaluations).expect("load"));
        for agent in [
            "Agent1_ResearchDestination",
            "Agent2_FindFlights",
            "Agent3_FindAccommodation",
            "Agent4_CreateItinerary",
            "Agent5_BudgetAnalysis",
        ] {
            assert!(table.contains(agent), "missing {agent}");
        }
        assert!(table.contains("5 trace(s), 5 evaluation(s)"));

        run(&[
            "levoyage",
            "report",
            path_arg(&traces),
            path_arg(&evaluations),
            "--project",
            path_arg(project.path()),
        ])
        .expect("report command");
    }

    #[test]
    fn test_report_rejects_malformed_documents() {
        let dir = TempDir::new().expect("tempdir");
        let traces = dir.path().join("traces.json");
        let evaluations = dir.path().join("evaluations.json");
        fs::write(&traces, "{\"not\": \"an array\"}").expect("write");
        fs::write(&evaluations, "[]").expect("write");

        let err = load_export(&traces, &evaluations).expect_err("malformed");
        assert!(matches!(err, CliError::Report { .. }));
        assert!(err.to_string().contains("malformed trace document"));
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lifecycle of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has started.
    NotStarted,
    /// Executing `step` of `total` (1-based).
    Running {
        /// Current step.
        step: usize,
        /// Pipeline length.
        total: usize,
    },
    /// Every stage completed.
    Completed,
    /// Stopped at `step`. Absorbing.
    Failed {
        /// Failing step.
        step: usize,
    },
}

/// Lifecycle metadata of the latest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    /// Identifier of the latest run.
    pub run_id: Option<String>,
    /// Current status.
    pub status: RunStatus,
    /// Pipeline length of the latest run.
    pub total_steps: usize,
    /// Agent ids that completed, in order.
    pub completed_steps: Vec<String>,
    /// Terminal error message, if the run failed.
    pub last_error: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            run_id: None,
            status: RunStatus::NotStarted,
            total_steps: 0,
            completed_steps: Vec::new(),
            last_error: None,
        }
    }
}

impl RunState {
    /// Reset for a fresh run.
    pub fn begin(&mut self, run_id: String, total_steps: usize) {
        *self = Self {
            run_id: Some(run_id),
            status: RunStatus::NotStarted,
            total_steps,
            completed_steps: Vec::new(),
            last_error: None,
        };
    }

    /// Enter `Running { step }`. Ignored once failed.
    pub fn advance(&mut self, step: usize) {
        if self.is_terminal() {
            return;
        }
        self.status = RunStatus::Running {
            step,
            total: self.total_steps,
        };
    }

    /// Record a completed step; the last one moves the run to `Completed`.
    pub fn complete_step(&mut self, agent_id: &str) {
        if self.is_terminal() {
            return;
        }
        self.completed_steps.push(agent_id.to_string());
        if self.completed_steps.len() >= self.total_steps {
            self.status = RunStatus::Completed;
        }
    }

    /// Move to the absorbing `Failed` state.
    pub fn fail(&mut self, step: usize, error: String) {
        self.status = RunStatus::Failed { step };
        self.last_error = Some(error);
    }

    /// True once completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed { .. })
    }

    /// Persist state to JSON file.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Load state from JSON file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

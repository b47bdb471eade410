// Console Progress
//
// *La Console* (The Console) - Step-by-step progress lines for interactive runs

use leplan::{LogSink, PlanEvent, TracingSink};
use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

/// Prints `[STEP i/N]` progress lines and forwards every event to `tracing`
pub struct ConsoleSink<W: Write = Stdout> {
    out: Mutex<W>,
    tracing: TracingSink,
}

impl ConsoleSink<Stdout> {
    /// Console sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Console sink writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            tracing: TracingSink,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn line(&self, text: String) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // Best effort: ignore closed pipes.
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl<W: Write> LogSink for ConsoleSink<W> {
    fn emit(&self, event: &PlanEvent) {
        self.tracing.emit(event);

        match event {
            PlanEvent::RunStarted {
                destination, total, ..
            } => self.line(format!("Planning trip to {} ({} agents)\n", destination, total)),
            PlanEvent::StepStarted {
                step,
                total,
                agent_id,
            } => self.line(format!("[STEP {}/{}] {}", step, total, agent_id)),
            PlanEvent::StepCompleted {
                duration_ms,
                output_length,
                ..
            } => self.line(format!(
                "  ✓ done in {:.1}ms ({} chars)",
                duration_ms, output_length
            )),
            PlanEvent::StepFailed { error, .. } => self.line(format!("  ✗ failed: {}", error)),
            PlanEvent::RunFailed {
                step, completed, ..
            } => self.line(format!(
                "\nStopped at step {} after {} completed step(s)",
                step, completed
            )),
            PlanEvent::ExportWritten { .. } | PlanEvent::RunCompleted { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lines() {
        let sink = ConsoleSink::new(Vec::new());
        sink.emit(&PlanEvent::StepStarted {
            step: 2,
            total: 5,
            agent_id: "Agent2_FindFlights".to_string(),
        });
        sink.emit(&PlanEvent::StepFailed {
            step: 2,
            total: 5,
            agent_id: "Agent2_FindFlights".to_string(),
            error: "no seats".to_string(),
        });

        let printed = String::from_utf8(sink.into_inner()).expect("utf8");
        assert!(printed.contains("[STEP 2/5] Agent2_FindFlights\n"));
        assert!(printed.contains("failed: no seats"));
    }

    #[test]
    fn test_silent_events() {
        let sink = ConsoleSink::new(Vec::new());
        sink.emit(&PlanEvent::RunCompleted {
            run_id: "abc".to_string(),
            steps: 5,
        });
        assert!(sink.into_inner().is_empty());
    }
}

use super::run_stage;
use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
use crate::observe::ObservabilityRecorder;
use crate::state::PlanningState;

/// Tools the research template reports.
pub const RESEARCH_TOOLS: &[&str] = &["search", "data_aggregation"];

/// Stage 1: gathers destination context for every later stage.
pub struct ResearchAgent {
    collaborator: Box<dyn StageCollaborator>,
}

impl ResearchAgent {
    /// Research backed by `collaborator`.
    pub fn new(collaborator: Box<dyn StageCollaborator>) -> Self {
        Self { collaborator }
    }
}

impl Default for ResearchAgent {
    fn default() -> Self {
        Self::new(Box::new(ResearchTemplate))
    }
}

impl Agent for ResearchAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ResearchDestination
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        run_stage(self.kind(), self.collaborator.as_ref(), state, recorder)
    }
}

/// Deterministic offline research brief.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResearchTemplate;

impl StageCollaborator for ResearchTemplate {
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        let destination = request.view.destination();
        let prefs = request.view.preferences();

        let mut out = format!("DESTINATION RESEARCH: {destination}\n\n");
        out.push_str(&format!(
            "Travel window: {} ({})\n",
            prefs.start_date.as_deref().unwrap_or("flexible dates"),
            prefs.duration.as_deref().unwrap_or("length not fixed"),
        ));
        out.push_str(&format!(
            "Travel style: {}\n\n",
            prefs.travel_style.as_deref().unwrap_or("general sightseeing"),
        ));

        out.push_str("Focus areas:\n");
        if prefs.interests.is_empty() {
            out.push_str(&format!("- Landmark districts of {destination}\n"));
            out.push_str("- Local food markets and neighbourhood dining\n");
            out.push_str("- Museums and day trips within two hours\n");
        } else {
            for interest in &prefs.interests {
                out.push_str(&format!("- {interest}: best-rated spots in {destination}\n"));
            }
        }

        out.push_str("\nPractical notes:\n");
        out.push_str("- Passport should be valid six months past the return date\n");
        out.push_str("- Check entry and visa requirements for your nationality\n");
        out.push_str("- Travel insurance covering medical costs is recommended\n");
        out.push_str("- Public transit passes usually beat taxis between districts\n");

        Ok(StageContent::text(out, RESEARCH_TOOLS))
    }
}

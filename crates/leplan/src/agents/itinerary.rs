use super::{run_stage, trip_days};
use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
use crate::observe::ObservabilityRecorder;
use crate::state::PlanningState;

/// Tools the itinerary template reports.
pub const ITINERARY_TOOLS: &[&str] = &["calendar", "map", "recommendations"];

const FALLBACK_THEMES: [&str; 4] = [
    "old town walking tour",
    "museums and galleries",
    "markets and street food",
    "parks and viewpoints",
];

/// Stage 4: day-by-day plan.
pub struct ItineraryAgent {
    collaborator: Box<dyn StageCollaborator>,
}

impl ItineraryAgent {
    /// Itinerary builder backed by `collaborator`.
    pub fn new(collaborator: Box<dyn StageCollaborator>) -> Self {
        Self { collaborator }
    }
}

impl Default for ItineraryAgent {
    fn default() -> Self {
        Self::new(Box::new(ItineraryTemplate))
    }
}

impl Agent for ItineraryAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::CreateItinerary
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        run_stage(self.kind(), self.collaborator.as_ref(), state, recorder)
    }
}

/// Deterministic offline day plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItineraryTemplate;

impl StageCollaborator for ItineraryTemplate {
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        let destination = request.view.destination();
        let prefs = request.view.preferences();
        let days = trip_days(prefs);

        let themes: Vec<&str> = if prefs.interests.is_empty() {
            FALLBACK_THEMES.to_vec()
        } else {
            prefs.interests.iter().map(String::as_str).collect()
        };

        let mut out = format!("{days}-DAY ITINERARY FOR {destination}\n\n");
        for day in 1..=days {
            let plan = if day == 1 {
                "Arrive, check in, evening stroll near the hotel".to_string()
            } else if day == days {
                "Last breakfast, souvenir shopping, transfer to the airport".to_string()
            } else {
                let theme = themes[(day as usize - 2) % themes.len()];
                format!("Morning: {theme}. Afternoon: free exploration. Evening: local dinner")
            };
            out.push_str(&format!("Day {day}: {plan}\n"));
        }
        out.push_str("\nKeep one flexible half-day for weather or rest.\n");

        Ok(StageContent::text(out, ITINERARY_TOOLS))
    }
}

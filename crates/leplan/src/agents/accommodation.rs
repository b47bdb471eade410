use super::{nightly_band, run_stage, trip_days, BudgetTier};
use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
use crate::observe::ObservabilityRecorder;
use crate::state::PlanningState;

/// Tools the accommodation template reports.
pub const ACCOMMODATION_TOOLS: &[&str] = &["hotel_search", "airbnb_search", "reviews"];

/// Stage 3: where to stay.
pub struct AccommodationAgent {
    collaborator: Box<dyn StageCollaborator>,
}

impl AccommodationAgent {
    /// Accommodation search backed by `collaborator`.
    pub fn new(collaborator: Box<dyn StageCollaborator>) -> Self {
        Self { collaborator }
    }
}

impl Default for AccommodationAgent {
    fn default() -> Self {
        Self::new(Box::new(AccommodationTemplate))
    }
}

impl Agent for AccommodationAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::FindAccommodation
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        run_stage(self.kind(), self.collaborator.as_ref(), state, recorder)
    }
}

/// Deterministic offline lodging shortlist.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccommodationTemplate;

impl StageCollaborator for AccommodationTemplate {
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        let destination = request.view.destination();
        let prefs = request.view.preferences();
        let tier = BudgetTier::from_preferences(prefs);
        let nights = trip_days(prefs).saturating_sub(1).max(1);
        let nightly = nightly_band(tier);

        let mut out = format!("ACCOMMODATION IN {destination}\n\n");
        out.push_str(&format!(
            "Stay: {nights} night(s), {} tier, {nightly} per night\n\n",
            tier.label()
        ));
        out.push_str("Shortlist:\n");
        match tier {
            BudgetTier::Budget => {
                out.push_str("- Hostel private room near a main transit line\n");
                out.push_str("- Guesthouse in a residential neighbourhood\n");
            }
            BudgetTier::Moderate => {
                out.push_str("- Business hotel within walking distance of the centre\n");
                out.push_str("- Apartment rental with kitchen, 4.5+ review average\n");
            }
            BudgetTier::Luxury => {
                out.push_str("- Five-star hotel with concierge and airport transfer\n");
                out.push_str("- Boutique suite in the historic district\n");
            }
        }
        out.push_str(&format!(
            "\nEstimated total: {} for the stay\n",
            nightly.times(nights)
        ));
        out.push_str("Filter by free cancellation and read reviews from the last 6 months.\n");

        Ok(StageContent::text(out, ACCOMMODATION_TOOLS))
    }
}

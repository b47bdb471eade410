use super::{flight_band, run_stage, BudgetTier};
use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
use crate::observe::ObservabilityRecorder;
use crate::state::PlanningState;

/// Tools the flight template reports.
pub const FLIGHT_TOOLS: &[&str] = &["flight_search", "price_comparison"];

/// Stage 2: flight options to the destination.
pub struct FlightsAgent {
    collaborator: Box<dyn StageCollaborator>,
}

impl FlightsAgent {
    /// Flight search backed by `collaborator`.
    pub fn new(collaborator: Box<dyn StageCollaborator>) -> Self {
        Self { collaborator }
    }
}

impl Default for FlightsAgent {
    fn default() -> Self {
        Self::new(Box::new(FlightsTemplate))
    }
}

impl Agent for FlightsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::FindFlights
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        run_stage(self.kind(), self.collaborator.as_ref(), state, recorder)
    }
}

/// Deterministic offline flight shortlist.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightsTemplate;

impl StageCollaborator for FlightsTemplate {
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        let destination = request.view.destination();
        let tier = BudgetTier::from_preferences(request.view.preferences());
        let band = flight_band(tier);

        let mut out = format!("FLIGHT OPTIONS TO {destination}\n\n");
        out.push_str(&format!(
            "1. Direct round trip, full-service carrier: ${}-${} per person\n",
            band.high.saturating_sub(band.high / 5),
            band.high,
        ));
        out.push_str(&format!(
            "2. One-stop round trip, mixed carriers: ${}-${} per person\n",
            band.low,
            band.low + (band.high - band.low) / 2,
        ));
        out.push_str(&format!(
            "3. Flexible-date fare, midweek departure: from ${} per person\n\n",
            band.low.saturating_sub(band.low / 10),
        ));

        let pick = match tier {
            BudgetTier::Budget => "option 3, flying midweek",
            BudgetTier::Moderate => "option 2, one stop keeps fares in range",
            BudgetTier::Luxury => "option 1, direct on a full-service carrier",
        };
        out.push_str(&format!("Recommended for a {} budget: {pick}\n", tier.label()));
        out.push_str("Book 6-8 weeks ahead; compare prices again 48 hours before buying.\n");

        Ok(StageContent::text(out, FLIGHT_TOOLS))
    }
}

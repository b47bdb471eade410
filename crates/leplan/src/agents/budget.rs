use super::{
    activity_band, flight_band, food_band, nightly_band, party_size, run_stage, trip_days,
    BudgetTier, PriceBand,
};
use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageContent,
    StageRequest,
};
use crate::observe::ObservabilityRecorder;
use crate::state::{PlanningState, StageValue};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Tools the budget template reports.
pub const BUDGET_TOOLS: &[&str] = &["cost_calculator", "price_database"];

/// Stage 5: cost breakdown over the whole plan.
pub struct BudgetAgent {
    collaborator: Box<dyn StageCollaborator>,
}

impl BudgetAgent {
    /// Budget analysis backed by `collaborator`.
    pub fn new(collaborator: Box<dyn StageCollaborator>) -> Self {
        Self { collaborator }
    }
}

impl Default for BudgetAgent {
    fn default() -> Self {
        Self::new(Box::new(BudgetTemplate))
    }
}

impl Agent for BudgetAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::BudgetAnalysis
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        run_stage(self.kind(), self.collaborator.as_ref(), state, recorder)
    }
}

/// Deterministic offline cost breakdown, emitted as a structured mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetTemplate;

impl StageCollaborator for BudgetTemplate {
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        let prefs = request.view.preferences();
        let tier = BudgetTier::from_preferences(prefs);
        let days = trip_days(prefs);
        let nights = days.saturating_sub(1).max(1);
        let travelers = party_size(prefs);
        let person_days = days.saturating_mul(travelers);

        let flights = flight_band(tier).times(travelers);
        let accommodation = nightly_band(tier).times(nights);
        let food = food_band(tier).times(person_days);
        let activities = activity_band(tier).times(person_days);
        let total = flights.plus(accommodation).plus(food).plus(activities);

        let mut breakdown: BTreeMap<String, Value> = BTreeMap::new();
        breakdown.insert("currency".to_string(), json!("USD"));
        breakdown.insert("tier".to_string(), json!(tier.label()));
        breakdown.insert("days".to_string(), json!(days));
        breakdown.insert("travelers".to_string(), json!(travelers));
        breakdown.insert("flights".to_string(), band_json(flights));
        breakdown.insert("accommodation".to_string(), band_json(accommodation));
        breakdown.insert("food".to_string(), band_json(food));
        breakdown.insert("activities".to_string(), band_json(activities));
        breakdown.insert("total".to_string(), band_json(total));
        breakdown.insert(
            "per_person_per_day".to_string(),
            band_json(PriceBand {
                low: total.low / person_days,
                high: total.high / person_days,
            }),
        );
        breakdown.insert(
            "recommendation".to_string(),
            json!(format!(
                "Set aside {} plus 10% contingency; flights are the main lever on cost.",
                total
            )),
        );

        Ok(StageContent {
            value: StageValue::Structured(breakdown),
            tools_used: Some(BUDGET_TOOLS.iter().map(|t| t.to_string()).collect()),
        })
    }
}

fn band_json(band: PriceBand) -> Value {
    json!({ "low": band.low, "high": band.high })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::TripPreferences;

    #[test]
    fn breakdown_scales_with_travelers_and_days() {
        let mut prefs = TripPreferences {
            duration: Some("5 days".to_string()),
            budget: Some("moderate".to_string()),
            ..TripPreferences::default()
        };
        prefs.apply_assignment("travelers=2").expect("assignment");
        let state = PlanningState::initialize("Tokyo, Japan", prefs);

        let content = BudgetTemplate
            .produce(&StageRequest {
                kind: AgentKind::BudgetAnalysis,
                view: state.view_for(AgentKind::BudgetAnalysis),
            })
            .expect("template");

        let StageValue::Structured(map) = content.value else {
            panic!("expected structured budget");
        };
        assert_eq!(map["travelers"], 2);
        assert_eq!(map["flights"]["low"], 1_200);
        assert_eq!(map["accommodation"]["low"], 320);
        assert_eq!(map["total"]["low"], 1_200 + 320 + 450 + 300);
    }
}

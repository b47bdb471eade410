//! The five pipeline stages and the ordered pipeline that holds them.

/// Stage 3: accommodation search.
pub mod accommodation;
/// Stage 5: budget analysis.
pub mod budget;
/// Stage 2: flight search.
pub mod flights;
/// Stage 4: itinerary construction.
pub mod itinerary;
/// Stage 1: destination research.
pub mod research;

pub use accommodation::{AccommodationAgent, AccommodationTemplate};
pub use budget::{BudgetAgent, BudgetTemplate};
pub use flights::{FlightsAgent, FlightsTemplate};
pub use itinerary::{ItineraryAgent, ItineraryTemplate};
pub use research::{ResearchAgent, ResearchTemplate};

use crate::agent::{
    Agent, AgentExecutionError, AgentKind, AgentOutput, StageCollaborator, StageRequest,
};
use crate::error::PlanError;
use crate::observe::ObservabilityRecorder;
use crate::preferences::TripPreferences;
use crate::state::PlanningState;
use std::time::Instant;

/// Step protocol shared by every stage.
///
/// Checks prerequisites, asks the collaborator for content, writes the owned
/// field through `record_step` exactly once, then logs the trace (which also
/// appends the evaluation). A collaborator failure leaves no trace behind.
pub(crate) fn run_stage(
    kind: AgentKind,
    collaborator: &dyn StageCollaborator,
    state: &mut PlanningState,
    recorder: &mut ObservabilityRecorder,
) -> Result<AgentOutput, AgentExecutionError> {
    let agent_id = kind.id();

    if let Some(missing) = kind
        .prerequisites()
        .iter()
        .find(|field| state.field(**field).is_none())
    {
        return Err(AgentExecutionError::MissingPrerequisite {
            agent_id: agent_id.to_string(),
            field: *missing,
        });
    }

    let before = state.snapshot();
    let started = Instant::now();

    let view = state.view_for(kind);
    let input_summary = view.context_summary();
    let content = collaborator
        .produce(&StageRequest { kind, view })
        .map_err(|source| AgentExecutionError::Collaborator {
            agent_id: agent_id.to_string(),
            source,
        })?;

    state.record_step(agent_id, [(kind.owned_field().name(), content.value.clone())])?;

    let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let after = state.snapshot();
    recorder.log_trace(
        agent_id,
        &input_summary,
        state.field(kind.owned_field()),
        content.tools_used.clone(),
        duration_ms,
        &before,
        &after,
    );

    Ok(AgentOutput {
        agent_id: agent_id.to_string(),
        value: content.value,
        tools_used: content.tools_used.unwrap_or_default().into_iter().collect(),
    })
}

/// Qualitative budget tier read from preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTier {
    /// Cheapest options.
    Budget,
    /// Balanced options (default).
    Moderate,
    /// Premium options.
    Luxury,
}

impl BudgetTier {
    /// Tier from the `budget` preference; unrecognized or absent means moderate.
    pub fn from_preferences(preferences: &TripPreferences) -> Self {
        match preferences
            .budget
            .as_deref()
            .map(|b| b.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("budget" | "low" | "cheap" | "backpacker") => Self::Budget,
            Some("luxury" | "high" | "premium") => Self::Luxury,
            _ => Self::Moderate,
        }
    }

    /// Lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Moderate => "moderate",
            Self::Luxury => "luxury",
        }
    }
}

/// Longest trip the templates will plan for.
pub const MAX_TRIP_DAYS: u32 = 365;

/// Largest party the templates will price.
pub const MAX_TRAVELERS: u32 = 100;

/// Trip length in days, defaulting to five and capped at [`MAX_TRIP_DAYS`].
pub(crate) fn trip_days(preferences: &TripPreferences) -> u32 {
    preferences
        .duration_days()
        .filter(|d| *d > 0)
        .unwrap_or(5)
        .min(MAX_TRIP_DAYS)
}

/// Party size from the `travelers` preference, defaulting to one and capped
/// at [`MAX_TRAVELERS`].
pub(crate) fn party_size(preferences: &TripPreferences) -> u32 {
    preferences
        .extra
        .get("travelers")
        .and_then(serde_json::Value::as_u64)
        .filter(|n| *n > 0)
        .map_or(1, |n| n.min(u64::from(MAX_TRAVELERS)) as u32)
}

/// Inclusive USD price range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PriceBand {
    pub(crate) low: u32,
    pub(crate) high: u32,
}

impl PriceBand {
    const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    pub(crate) fn times(self, count: u32) -> Self {
        Self::new(self.low.saturating_mul(count), self.high.saturating_mul(count))
    }

    pub(crate) fn plus(self, other: Self) -> Self {
        Self::new(
            self.low.saturating_add(other.low),
            self.high.saturating_add(other.high),
        )
    }
}

impl std::fmt::Display for PriceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}-${}", self.low, self.high)
    }
}

/// Round-trip economy/premium fare per traveler.
pub(crate) fn flight_band(tier: BudgetTier) -> PriceBand {
    match tier {
        BudgetTier::Budget => PriceBand::new(450, 650),
        BudgetTier::Moderate => PriceBand::new(600, 900),
        BudgetTier::Luxury => PriceBand::new(1_800, 3_500),
    }
}

/// Per-night room rate.
pub(crate) fn nightly_band(tier: BudgetTier) -> PriceBand {
    match tier {
        BudgetTier::Budget => PriceBand::new(40, 80),
        BudgetTier::Moderate => PriceBand::new(80, 150),
        BudgetTier::Luxury => PriceBand::new(250, 500),
    }
}

/// Per-day food spend.
pub(crate) fn food_band(tier: BudgetTier) -> PriceBand {
    match tier {
        BudgetTier::Budget => PriceBand::new(25, 40),
        BudgetTier::Moderate => PriceBand::new(45, 85),
        BudgetTier::Luxury => PriceBand::new(120, 250),
    }
}

/// Per-day activities and local transport.
pub(crate) fn activity_band(tier: BudgetTier) -> PriceBand {
    match tier {
        BudgetTier::Budget => PriceBand::new(10, 25),
        BudgetTier::Moderate => PriceBand::new(30, 60),
        BudgetTier::Luxury => PriceBand::new(80, 200),
    }
}

/// Closed set of agents a pipeline can hold.
pub enum PipelineAgent {
    /// Stage 1.
    Research(ResearchAgent),
    /// Stage 2.
    Flights(FlightsAgent),
    /// Stage 3.
    Accommodation(AccommodationAgent),
    /// Stage 4.
    Itinerary(ItineraryAgent),
    /// Stage 5.
    Budget(BudgetAgent),
}

impl PipelineAgent {
    /// Agent of `kind` backed by `collaborator`.
    pub fn with_collaborator<C>(kind: AgentKind, collaborator: C) -> Self
    where
        C: StageCollaborator + 'static,
    {
        let collaborator: Box<dyn StageCollaborator> = Box::new(collaborator);
        match kind {
            AgentKind::ResearchDestination => Self::Research(ResearchAgent::new(collaborator)),
            AgentKind::FindFlights => Self::Flights(FlightsAgent::new(collaborator)),
            AgentKind::FindAccommodation => {
                Self::Accommodation(AccommodationAgent::new(collaborator))
            }
            AgentKind::CreateItinerary => Self::Itinerary(ItineraryAgent::new(collaborator)),
            AgentKind::BudgetAnalysis => Self::Budget(BudgetAgent::new(collaborator)),
        }
    }

    /// Agent of `kind` backed by its built-in template.
    pub fn template(kind: AgentKind) -> Self {
        match kind {
            AgentKind::ResearchDestination => Self::Research(ResearchAgent::default()),
            AgentKind::FindFlights => Self::Flights(FlightsAgent::default()),
            AgentKind::FindAccommodation => Self::Accommodation(AccommodationAgent::default()),
            AgentKind::CreateItinerary => Self::Itinerary(ItineraryAgent::default()),
            AgentKind::BudgetAnalysis => Self::Budget(BudgetAgent::default()),
        }
    }
}

impl Agent for PipelineAgent {
    fn kind(&self) -> AgentKind {
        match self {
            Self::Research(agent) => agent.kind(),
            Self::Flights(agent) => agent.kind(),
            Self::Accommodation(agent) => agent.kind(),
            Self::Itinerary(agent) => agent.kind(),
            Self::Budget(agent) => agent.kind(),
        }
    }

    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError> {
        match self {
            Self::Research(agent) => agent.execute(state, recorder),
            Self::Flights(agent) => agent.execute(state, recorder),
            Self::Accommodation(agent) => agent.execute(state, recorder),
            Self::Itinerary(agent) => agent.execute(state, recorder),
            Self::Budget(agent) => agent.execute(state, recorder),
        }
    }
}

impl From<ResearchAgent> for PipelineAgent {
    fn from(agent: ResearchAgent) -> Self {
        Self::Research(agent)
    }
}

impl From<FlightsAgent> for PipelineAgent {
    fn from(agent: FlightsAgent) -> Self {
        Self::Flights(agent)
    }
}

impl From<AccommodationAgent> for PipelineAgent {
    fn from(agent: AccommodationAgent) -> Self {
        Self::Accommodation(agent)
    }
}

impl From<ItineraryAgent> for PipelineAgent {
    fn from(agent: ItineraryAgent) -> Self {
        Self::Itinerary(agent)
    }
}

impl From<BudgetAgent> for PipelineAgent {
    fn from(agent: BudgetAgent) -> Self {
        Self::Budget(agent)
    }
}

/// Ordered, validated list of agents.
pub struct Pipeline {
    agents: Vec<PipelineAgent>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// The five template-backed stages in standard order.
    pub fn standard() -> Self {
        Self {
            agents: AgentKind::ALL
                .into_iter()
                .map(PipelineAgent::template)
                .collect(),
        }
    }

    /// Validate an explicit agent list.
    ///
    /// Stages must be unique, in pipeline order, and every prerequisite must be
    /// owned by a stage earlier in the list.
    pub fn new(agents: Vec<PipelineAgent>) -> Result<Self, PlanError> {
        if agents.is_empty() {
            return Err(PlanError::InvalidPipeline(
                "pipeline must contain at least one agent".to_string(),
            ));
        }

        let mut seen: Vec<AgentKind> = Vec::with_capacity(agents.len());
        for agent in &agents {
            let kind = agent.kind();
            if let Some(last) = seen.last() {
                if *last >= kind {
                    return Err(PlanError::InvalidPipeline(format!(
                        "{} cannot follow {}",
                        kind.id(),
                        last.id()
                    )));
                }
            }
            if let Some(field) = kind
                .prerequisites()
                .iter()
                .find(|field| !seen.contains(&field.owner()))
            {
                return Err(PlanError::InvalidPipeline(format!(
                    "{} requires '{}' but {} is not earlier in the pipeline",
                    kind.id(),
                    field,
                    field.owner().id()
                )));
            }
            seen.push(kind);
        }

        Ok(Self { agents })
    }

    /// Replace the collaborator behind one stage, keeping order.
    pub fn with_collaborator<C>(mut self, kind: AgentKind, collaborator: C) -> Self
    where
        C: StageCollaborator + 'static,
    {
        if let Some(slot) = self.agents.iter_mut().find(|agent| agent.kind() == kind) {
            *slot = PipelineAgent::with_collaborator(kind, collaborator);
        }
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// True when no stage is configured.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Stage kinds in order.
    pub fn kinds(&self) -> Vec<AgentKind> {
        self.agents.iter().map(Agent::kind).collect()
    }

    /// Agents in order.
    pub fn iter(&self) -> impl Iterator<Item = &PipelineAgent> {
        self.agents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StageContent;
    use crate::state::StageField;
    use anyhow::anyhow;
    use rstest::rstest;

    fn tokyo() -> PlanningState {
        PlanningState::initialize(
            "Tokyo, Japan",
            TripPreferences {
                duration: Some("5 days".to_string()),
                budget: Some("moderate".to_string()),
                ..TripPreferences::default()
            },
        )
    }

    #[test]
    fn standard_pipeline_runs_all_stages_in_order() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.kinds(), AgentKind::ALL.to_vec());

        let mut state = tokyo();
        let mut recorder = ObservabilityRecorder::default();
        for agent in pipeline.iter() {
            let output = agent.execute(&mut state, &mut recorder).expect("stage");
            assert_eq!(output.agent_id, agent.kind().id());
            assert!(!output.value.is_empty());
        }

        assert!(state.is_complete());
        assert_eq!(recorder.traces().len(), 5);
        assert!(recorder.evaluations().iter().all(|e| e.state_consistency));
        assert!(recorder.evaluations().iter().all(|e| e.completion_rate == 1.0));
    }

    #[test]
    fn stage_without_prerequisites_fails_before_writing() {
        let mut state = tokyo();
        let mut recorder = ObservabilityRecorder::default();
        let err = PipelineAgent::template(AgentKind::FindFlights)
            .execute(&mut state, &mut recorder)
            .expect_err("research missing");

        assert!(matches!(
            err,
            AgentExecutionError::MissingPrerequisite {
                field: StageField::Research,
                ..
            }
        ));
        assert!(state.execution_order.is_empty());
        assert!(recorder.traces().is_empty());
    }

    #[test]
    fn collaborator_failure_leaves_no_trace() {
        let failing = |_: &StageRequest<'_>| -> anyhow::Result<StageContent> {
            Err(anyhow!("upstream unavailable"))
        };
        let agent = PipelineAgent::with_collaborator(AgentKind::ResearchDestination, failing);

        let mut state = tokyo();
        let mut recorder = ObservabilityRecorder::default();
        let err = agent.execute(&mut state, &mut recorder).expect_err("fails");

        assert!(err.to_string().contains("upstream unavailable"));
        assert!(recorder.traces().is_empty());
        assert!(state.research.is_none());
    }

    #[test]
    fn collaborator_without_tools_scores_default_effectiveness() {
        let silent = |_: &StageRequest<'_>| -> anyhow::Result<StageContent> {
            Ok(StageContent {
                value: "quiet research".into(),
                tools_used: None,
            })
        };
        let agent = PipelineAgent::with_collaborator(AgentKind::ResearchDestination, silent);

        let mut state = tokyo();
        let mut recorder = ObservabilityRecorder::default();
        let output = agent.execute(&mut state, &mut recorder).expect("runs");

        assert!(output.tools_used.is_empty());
        assert_eq!(recorder.evaluations()[0].tool_effectiveness, 0.5);
    }

    #[test]
    fn collaborator_sees_only_earlier_fields() {
        let inspect = |request: &StageRequest<'_>| -> anyhow::Result<StageContent> {
            assert!(request.view.field(StageField::Research).is_some());
            assert!(request.view.field(StageField::Flights).is_none());
            Ok(StageContent::text("flights", &["flight_search"]))
        };

        let mut state = tokyo();
        let mut recorder = ObservabilityRecorder::default();
        PipelineAgent::template(AgentKind::ResearchDestination)
            .execute(&mut state, &mut recorder)
            .expect("research");
        PipelineAgent::with_collaborator(AgentKind::FindFlights, inspect)
            .execute(&mut state, &mut recorder)
            .expect("flights");
    }

    #[rstest]
    #[case(vec![AgentKind::FindFlights, AgentKind::ResearchDestination])]
    #[case(vec![AgentKind::ResearchDestination, AgentKind::ResearchDestination])]
    #[case(vec![AgentKind::ResearchDestination, AgentKind::FindAccommodation])]
    #[case(vec![])]
    fn invalid_pipelines_are_rejected(#[case] kinds: Vec<AgentKind>) {
        let agents = kinds.into_iter().map(PipelineAgent::template).collect();
        assert!(matches!(
            Pipeline::new(agents),
            Err(PlanError::InvalidPipeline(_))
        ));
    }

    #[test]
    fn prefix_pipeline_is_valid() {
        let pipeline = Pipeline::new(vec![
            ResearchAgent::default().into(),
            FlightsAgent::default().into(),
        ])
        .expect("valid prefix");
        assert_eq!(pipeline.len(), 2);
    }

    #[rstest]
    #[case(Some("Luxury"), BudgetTier::Luxury)]
    #[case(Some("backpacker"), BudgetTier::Budget)]
    #[case(Some("moderate"), BudgetTier::Moderate)]
    #[case(None, BudgetTier::Moderate)]
    fn budget_tier_parses_preference(#[case] raw: Option<&str>, #[case] tier: BudgetTier) {
        let prefs = TripPreferences {
            budget: raw.map(str::to_string),
            ..TripPreferences::default()
        };
        assert_eq!(BudgetTier::from_preferences(&prefs), tier);
    }

    #[rstest]
    #[case(None, 5)]
    #[case(Some("0 days"), 5)]
    #[case(Some("12 days"), 12)]
    #[case(Some("100000000 days"), MAX_TRIP_DAYS)]
    fn trip_days_defaults_and_caps(#[case] raw: Option<&str>, #[case] days: u32) {
        let prefs = TripPreferences {
            duration: raw.map(str::to_string),
            ..TripPreferences::default()
        };
        assert_eq!(trip_days(&prefs), days);
    }

    #[rstest]
    #[case(None, 1)]
    #[case(Some("travelers=0"), 1)]
    #[case(Some("travelers=4"), 4)]
    #[case(Some("travelers=2000000"), MAX_TRAVELERS)]
    #[case(Some("travelers=99999999999999"), MAX_TRAVELERS)]
    fn party_size_defaults_and_caps(#[case] assignment: Option<&str>, #[case] size: u32) {
        let mut prefs = TripPreferences::default();
        if let Some(assignment) = assignment {
            prefs.apply_assignment(assignment).expect("assignment");
        }
        assert_eq!(party_size(&prefs), size);
    }

    #[test]
    fn price_band_arithmetic_saturates() {
        let band = PriceBand::new(600, 900).times(u32::MAX);
        assert_eq!(band, PriceBand::new(u32::MAX, u32::MAX));
        assert_eq!(band.plus(PriceBand::new(1, 1)), band);
    }

    #[test]
    fn standard_pipeline_handles_extreme_trip_sizes() {
        let mut prefs = TripPreferences {
            duration: Some("100000000 days".to_string()),
            budget: Some("luxury".to_string()),
            ..TripPreferences::default()
        };
        prefs
            .apply_assignment("travelers=2000000")
            .expect("assignment");
        let mut state = PlanningState::initialize("Tokyo, Japan", prefs);
        let mut recorder = ObservabilityRecorder::default();

        for agent in Pipeline::standard().iter() {
            agent.execute(&mut state, &mut recorder).expect("stage");
        }

        let itinerary = state.itinerary.as_ref().expect("itinerary").render();
        let day_lines = itinerary.lines().filter(|l| l.starts_with("Day ")).count();
        assert_eq!(day_lines, MAX_TRIP_DAYS as usize);
        assert!(state.is_complete());
    }
}

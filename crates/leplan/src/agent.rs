use crate::observe::ObservabilityRecorder;
use crate::state::{PlanningState, StageField, StageValue, StateError, StateView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The closed set of pipeline stages, ordered as they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Stage 1: destination research.
    ResearchDestination,
    /// Stage 2: flight search.
    FindFlights,
    /// Stage 3: accommodation search.
    FindAccommodation,
    /// Stage 4: itinerary construction.
    CreateItinerary,
    /// Stage 5: budget analysis.
    BudgetAnalysis,
}

impl AgentKind {
    /// All stages in pipeline order.
    pub const ALL: [AgentKind; 5] = [
        AgentKind::ResearchDestination,
        AgentKind::FindFlights,
        AgentKind::FindAccommodation,
        AgentKind::CreateItinerary,
        AgentKind::BudgetAnalysis,
    ];

    /// Stable agent identifier used in logs, traces and state.
    pub fn id(self) -> &'static str {
        match self {
            Self::ResearchDestination => "Agent1_ResearchDestination",
            Self::FindFlights => "Agent2_FindFlights",
            Self::FindAccommodation => "Agent3_FindAccommodation",
            Self::CreateItinerary => "Agent4_CreateItinerary",
            Self::BudgetAnalysis => "Agent5_BudgetAnalysis",
        }
    }

    /// Resolve an agent identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// 1-based position in the standard pipeline.
    pub fn step(self) -> usize {
        self as usize + 1
    }

    /// Stage field this agent writes.
    pub fn owned_field(self) -> StageField {
        match self {
            Self::ResearchDestination => StageField::Research,
            Self::FindFlights => StageField::Flights,
            Self::FindAccommodation => StageField::Accommodation,
            Self::CreateItinerary => StageField::Itinerary,
            Self::BudgetAnalysis => StageField::BudgetAnalysis,
        }
    }

    /// Stage fields that must be populated before this agent runs.
    pub fn prerequisites(self) -> &'static [StageField] {
        match self {
            Self::ResearchDestination => &[],
            Self::FindFlights => &[StageField::Research],
            Self::FindAccommodation => &[StageField::Research, StageField::Flights],
            Self::CreateItinerary => &[
                StageField::Research,
                StageField::Flights,
                StageField::Accommodation,
            ],
            Self::BudgetAnalysis => &[
                StageField::Flights,
                StageField::Accommodation,
                StageField::Itinerary,
            ],
        }
    }

    /// Short human label.
    pub fn title(self) -> &'static str {
        match self {
            Self::ResearchDestination => "Research Destination",
            Self::FindFlights => "Find Flights",
            Self::FindAccommodation => "Find Accommodation",
            Self::CreateItinerary => "Create Itinerary",
            Self::BudgetAnalysis => "Budget Analysis",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Failure raised from inside an agent's `execute`.
#[derive(Debug, Error)]
pub enum AgentExecutionError {
    /// The external content producer failed.
    #[error("{agent_id}: collaborator failed: {source}")]
    Collaborator {
        /// Failing agent.
        agent_id: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// A field this agent depends on was never populated.
    #[error("{agent_id}: prerequisite field '{field}' is absent")]
    MissingPrerequisite {
        /// Failing agent.
        agent_id: String,
        /// Absent field.
        field: StageField,
    },

    /// The state rejected the agent's write.
    #[error(transparent)]
    State(#[from] StateError),

    /// The agent returned without honoring the step protocol.
    #[error("{agent_id}: contract violation: {detail}")]
    ContractViolation {
        /// Offending agent.
        agent_id: String,
        /// What was wrong.
        detail: String,
    },
}

/// What an agent hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Producing agent.
    pub agent_id: String,
    /// Produced value (also written into the owned stage field).
    pub value: StageValue,
    /// External capabilities exercised.
    pub tools_used: BTreeSet<String>,
}

/// Uniform interface every pipeline stage implements.
pub trait Agent {
    /// Which stage this agent is.
    fn kind(&self) -> AgentKind;

    /// Run the stage: read earlier output, call `record_step` once with the
    /// owned field, report to the recorder, and return the raw output.
    fn execute(
        &self,
        state: &mut PlanningState,
        recorder: &mut ObservabilityRecorder,
    ) -> Result<AgentOutput, AgentExecutionError>;
}

/// Input handed to a collaborator.
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    /// Stage being produced.
    pub kind: AgentKind,
    /// Read-only state limited to earlier stages.
    pub view: StateView<'a>,
}

/// Content returned by a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct StageContent {
    /// Value to store in the owned field.
    pub value: StageValue,
    /// Tools the collaborator reports having used. `None` when unreported.
    pub tools_used: Option<Vec<String>>,
}

impl StageContent {
    /// Text content with the given tools.
    pub fn text<S: Into<String>>(text: S, tools: &[&str]) -> Self {
        Self {
            value: StageValue::Text(text.into()),
            tools_used: Some(tools.iter().map(|tool| tool.to_string()).collect()),
        }
    }
}

/// Pluggable content producer behind a stage (LLM, travel API, template).
pub trait StageCollaborator {
    /// Produce the content for one stage.
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent>;
}

impl<F> StageCollaborator for F
where
    F: Fn(&StageRequest<'_>) -> anyhow::Result<StageContent>,
{
    fn produce(&self, request: &StageRequest<'_>) -> anyhow::Result<StageContent> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_follow_pipeline_order() {
        for (index, kind) in AgentKind::ALL.iter().enumerate() {
            assert_eq!(AgentKind::from_id(kind.id()), Some(*kind));
            assert_eq!(kind.step(), index + 1);
            assert_eq!(kind.owned_field().owner(), *kind);
        }
        assert_eq!(AgentKind::from_id("Agent9_Unknown"), None);
    }

    #[test]
    fn prerequisites_are_owned_by_earlier_stages() {
        for kind in AgentKind::ALL {
            assert!(kind
                .prerequisites()
                .iter()
                .all(|field| field.owner() < kind));
        }
    }
}

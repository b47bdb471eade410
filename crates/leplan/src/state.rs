use crate::agent::AgentKind;
use crate::preferences::TripPreferences;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Rejected writes against the planning state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Field name is not part of the planning schema.
    #[error("unknown state field '{field}'")]
    UnknownField {
        /// Name supplied by the caller.
        field: String,
    },

    /// Field is fixed at initialization.
    #[error("state field '{field}' is immutable after initialization")]
    ImmutableField {
        /// Name supplied by the caller.
        field: String,
    },

    /// Stage field already populated by an earlier step.
    #[error("stage field '{field}' was already written by {owner}")]
    AlreadyWritten {
        /// Stage field name.
        field: String,
        /// Agent id recorded for the earlier write.
        owner: String,
    },
}

/// One of the five stage slots in the planning state, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageField {
    /// Destination research findings.
    Research,
    /// Flight options.
    Flights,
    /// Accommodation options.
    Accommodation,
    /// Day-by-day itinerary.
    Itinerary,
    /// Cost breakdown.
    BudgetAnalysis,
}

impl StageField {
    /// All stage fields in pipeline order.
    pub const ALL: [StageField; 5] = [
        StageField::Research,
        StageField::Flights,
        StageField::Accommodation,
        StageField::Itinerary,
        StageField::BudgetAnalysis,
    ];

    /// Schema name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Flights => "flights",
            Self::Accommodation => "accommodation",
            Self::Itinerary => "itinerary",
            Self::BudgetAnalysis => "budget_analysis",
        }
    }

    /// Parse a schema name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == value)
    }

    /// Agent responsible for populating this field.
    pub fn owner(self) -> AgentKind {
        match self {
            Self::Research => AgentKind::ResearchDestination,
            Self::Flights => AgentKind::FindFlights,
            Self::Accommodation => AgentKind::FindAccommodation,
            Self::Itinerary => AgentKind::CreateItinerary,
            Self::BudgetAnalysis => AgentKind::BudgetAnalysis,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::Research => "Research Findings",
            Self::Flights => "Flight Options",
            Self::Accommodation => "Accommodation Options",
            Self::Itinerary => "Itinerary",
            Self::BudgetAnalysis => "Budget Analysis",
        }
    }
}

impl fmt::Display for StageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured result written into a stage field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    /// Free-form text output.
    Text(String),
    /// Mapping output.
    Structured(BTreeMap<String, serde_json::Value>),
}

impl StageValue {
    /// True if the value carries no content.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(map) => map.is_empty(),
        }
    }

    /// Size metric used for traces: characters for text, encoded length for mappings.
    pub fn output_length(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Structured(map) => serde_json::to_string(map)
                .map(|encoded| encoded.chars().count())
                .unwrap_or(0),
        }
    }

    /// Render the value as display text.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(map) => serde_json::to_string_pretty(map).unwrap_or_default(),
        }
    }
}

impl From<String> for StageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Which stage fields were populated at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Fields holding any value.
    pub populated: BTreeSet<StageField>,
    /// Fields holding a non-empty value.
    pub non_empty: BTreeSet<StageField>,
}

/// Shared accumulator threaded through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningState {
    /// Trip destination.
    pub destination: String,
    /// User preferences.
    pub preferences: TripPreferences,
    /// Destination research.
    pub research: Option<StageValue>,
    /// Flight options.
    pub flights: Option<StageValue>,
    /// Accommodation options.
    pub accommodation: Option<StageValue>,
    /// Itinerary.
    pub itinerary: Option<StageValue>,
    /// Budget analysis.
    pub budget_analysis: Option<StageValue>,
    /// Agent ids in completion order.
    pub execution_order: Vec<String>,
    /// Completion instant per agent id.
    pub timestamps: BTreeMap<String, DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last successful write.
    pub updated_at: DateTime<Utc>,
}

impl PlanningState {
    /// Create a state with every stage field absent and empty logs.
    pub fn initialize(destination: impl Into<String>, preferences: TripPreferences) -> Self {
        let now = Utc::now();
        Self {
            destination: destination.into(),
            preferences,
            research: None,
            flights: None,
            accommodation: None,
            itinerary: None,
            budget_analysis: None,
            execution_order: Vec::new(),
            timestamps: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Read a stage field.
    pub fn field(&self, field: StageField) -> Option<&StageValue> {
        match field {
            StageField::Research => self.research.as_ref(),
            StageField::Flights => self.flights.as_ref(),
            StageField::Accommodation => self.accommodation.as_ref(),
            StageField::Itinerary => self.itinerary.as_ref(),
            StageField::BudgetAnalysis => self.budget_analysis.as_ref(),
        }
    }

    fn slot_mut(&mut self, field: StageField) -> &mut Option<StageValue> {
        match field {
            StageField::Research => &mut self.research,
            StageField::Flights => &mut self.flights,
            StageField::Accommodation => &mut self.accommodation,
            StageField::Itinerary => &mut self.itinerary,
            StageField::BudgetAnalysis => &mut self.budget_analysis,
        }
    }

    /// Record one completed step.
    ///
    /// Every field is validated before anything is written, so a rejected call
    /// leaves the state untouched. Repeated agent ids are not deduplicated here.
    pub fn record_step<I, K>(&mut self, agent_id: &str, fields: I) -> Result<(), StateError>
    where
        I: IntoIterator<Item = (K, StageValue)>,
        K: AsRef<str>,
    {
        let mut writes: Vec<(StageField, StageValue)> = Vec::new();
        for (name, value) in fields {
            let name = name.as_ref();
            if name == "destination" || name == "preferences" {
                return Err(StateError::ImmutableField {
                    field: name.to_string(),
                });
            }
            let field = StageField::parse(name).ok_or_else(|| StateError::UnknownField {
                field: name.to_string(),
            })?;
            if self.field(field).is_some() || writes.iter().any(|(seen, _)| *seen == field) {
                return Err(StateError::AlreadyWritten {
                    field: field.name().to_string(),
                    owner: self.writer_of(field).unwrap_or("an earlier step").to_string(),
                });
            }
            writes.push((field, value));
        }

        for (field, value) in writes {
            *self.slot_mut(field) = Some(value);
        }

        let now = Utc::now();
        self.execution_order.push(agent_id.to_string());
        self.timestamps.insert(agent_id.to_string(), now);
        self.updated_at = now;
        Ok(())
    }

    fn writer_of(&self, field: StageField) -> Option<&str> {
        let owner = field.owner().id();
        self.execution_order
            .iter()
            .find(|id| id.as_str() == owner)
            .map(String::as_str)
    }

    /// Populated and non-empty stage fields right now.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        for field in StageField::ALL {
            if let Some(value) = self.field(field) {
                snapshot.populated.insert(field);
                if !value.is_empty() {
                    snapshot.non_empty.insert(field);
                }
            }
        }
        snapshot
    }

    /// True once every stage field holds a value.
    pub fn is_complete(&self) -> bool {
        StageField::ALL.iter().all(|field| self.field(*field).is_some())
    }

    /// Read-only view limited to what `kind` may see.
    pub fn view_for(&self, kind: AgentKind) -> StateView<'_> {
        StateView { state: self, kind }
    }
}

/// Read-only view of the state exposing only fields owned by earlier agents.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a PlanningState,
    kind: AgentKind,
}

impl<'a> StateView<'a> {
    /// Agent this view was built for.
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Trip destination.
    pub fn destination(&self) -> &'a str {
        &self.state.destination
    }

    /// User preferences.
    pub fn preferences(&self) -> &'a TripPreferences {
        &self.state.preferences
    }

    /// Stage field value, hidden unless owned by an earlier agent.
    pub fn field(&self, field: StageField) -> Option<&'a StageValue> {
        if field.owner() < self.kind {
            self.state.field(field)
        } else {
            None
        }
    }

    /// Fields this view is allowed to read.
    pub fn visible_fields(&self) -> impl Iterator<Item = StageField> + '_ {
        StageField::ALL
            .into_iter()
            .filter(move |field| field.owner() < self.kind)
    }

    /// Context handed to the agent: destination, preferences and visible stage output.
    pub fn context_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.state.destination.is_empty() {
            parts.push(format!("Destination: {}", self.state.destination));
        }
        if !self.state.preferences.is_empty() {
            let encoded = serde_json::to_string(&self.state.preferences).unwrap_or_default();
            parts.push(format!("Preferences: {}", encoded));
        }
        for field in self.visible_fields() {
            if let Some(value) = self.state.field(field) {
                parts.push(format!("{}:\n{}", field.heading(), value.render()));
            }
        }
        parts.join("\n\n")
    }
}

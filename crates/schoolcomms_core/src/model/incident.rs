//! Incident reports and their review state.

use super::user::UserId;
use super::{now_ms, EpochMillis, ValidationErrors};
use serde::Serialize;
use uuid::Uuid;

pub type IncidentId = Uuid;

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Technical,
    Disciplinary,
    Other,
}

impl IncidentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Disciplinary => "disciplinary",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "technical" => Some(Self::Technical),
            "disciplinary" => Some(Self::Disciplinary),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Pending,
    Review,
    Resolved,
}

impl IncidentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Review => "review",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "review" => Some(Self::Review),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Incident {
    pub uuid: IncidentId,
    pub author: Option<UserId>,
    pub title: String,
    pub description: String,
    pub category: IncidentCategory,
    pub state: IncidentState,
    pub reported_at: EpochMillis,
    pub resolved_at: Option<EpochMillis>,
}

impl Incident {
    /// New reports always start `Pending`.
    pub fn new(
        author: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
        category: IncidentCategory,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            author: Some(author),
            title: title.into(),
            description: description.into(),
            category,
            state: IncidentState::Pending,
            reported_at: now_ms(),
            resolved_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("title", &self.title, TITLE_MAX_CHARS);
        if self.description.trim().is_empty() {
            errors.add("description", "this field is required");
        }
        errors.into_result()
    }

    /// Short label: the title, or the first 60 characters of the description.
    pub fn summary(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        let mut text: String = self.description.chars().take(60).collect();
        if self.description.chars().count() > 60 {
            text.push_str("...");
        }
        text
    }
}

/// Incidents split by state, newest first within each bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentBoard {
    pub pending: Vec<Incident>,
    pub review: Vec<Incident>,
    pub resolved: Vec<Incident>,
}

impl IncidentBoard {
    pub fn from_incidents(incidents: Vec<Incident>) -> Self {
        let mut board = Self::default();
        for incident in incidents {
            match incident.state {
                IncidentState::Pending => board.pending.push(incident),
                IncidentState::Review => board.review.push(incident),
                IncidentState::Resolved => board.resolved.push(incident),
            }
        }
        board
    }
}

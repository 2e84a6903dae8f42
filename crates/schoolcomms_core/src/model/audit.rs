//! Append-only audit trail of user actions.

use super::user::UserId;
use super::{now_ms, EpochMillis};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub uuid: Uuid,
    pub user: Option<UserId>,
    /// Dotted action name, e.g. `announcement.create`.
    pub action: String,
    pub created_at: EpochMillis,
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(user: Option<UserId>, action: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user,
            action: action.into(),
            created_at: now_ms(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

//! Private messages between two users.

use super::user::UserId;
use super::{now_ms, EpochMillis, ValidationErrors};
use serde::Serialize;
use uuid::Uuid;

pub type MessageId = Uuid;

pub const SUBJECT_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateMessage {
    pub uuid: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub subject: String,
    pub content: String,
    pub created_at: EpochMillis,
    pub is_read: bool,
}

impl PrivateMessage {
    pub fn new(
        sender: UserId,
        receiver: UserId,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            sender,
            receiver,
            subject: subject.into(),
            content: content.into(),
            created_at: now_ms(),
            is_read: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.limit_text("subject", &self.subject, SUBJECT_MAX_CHARS);
        errors.require_text("content", &self.content, CONTENT_MAX_CHARS);
        errors.into_result()
    }

    /// Subject for a reply: `Re: <subject>`, or `Re:` when blank.
    pub fn reply_subject(&self) -> String {
        if self.subject.trim().is_empty() {
            "Re:".to_string()
        } else {
            format!("Re: {}", self.subject)
        }
    }
}

//! Announcements and per-recipient read receipts.
//!
//! # Invariants
//! - One receipt per `(announcement, user)`; `read_at` is set at most once.

use super::user::{GroupId, UserId};
use super::{now_ms, EpochMillis, ValidationErrors};
use serde::Serialize;
use uuid::Uuid;

pub type AnnouncementId = Uuid;

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub uuid: AnnouncementId,
    pub author: UserId,
    pub title: String,
    pub content: String,
    pub created_at: EpochMillis,
    /// Users addressed directly.
    pub recipients: Vec<UserId>,
    /// Class groups whose members are also addressed.
    pub target_groups: Vec<GroupId>,
}

impl Announcement {
    pub fn new(author: UserId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            author,
            title: title.into(),
            content: content.into(),
            created_at: now_ms(),
            recipients: Vec::new(),
            target_groups: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("title", &self.title, TITLE_MAX_CHARS);
        if self.content.trim().is_empty() {
            errors.add("content", "this field is required");
        }
        errors.into_result()
    }
}

/// Read state of one announcement for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnouncementRead {
    pub announcement: AnnouncementId,
    pub user: UserId,
    pub read_at: Option<EpochMillis>,
}

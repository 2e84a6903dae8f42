//! In-app notifications.

use super::announcement::AnnouncementId;
use super::message::MessageId;
use super::user::UserId;
use super::{now_ms, EpochMillis};
use serde::Serialize;
use uuid::Uuid;

pub type NotificationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    Success,
    Announcement,
    Message,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
            Self::Announcement => "announcement",
            Self::Message => "message",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "success" => Some(Self::Success),
            "announcement" => Some(Self::Announcement),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub uuid: NotificationId,
    pub user: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    /// Link to the entity that triggered the notification.
    pub url: Option<String>,
    pub created_at: EpochMillis,
    pub is_read: bool,
    pub message: Option<MessageId>,
    pub announcement: Option<AnnouncementId>,
}

impl Notification {
    pub fn new(
        user: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user,
            kind,
            title: title.into(),
            content: content.into(),
            url: None,
            created_at: now_ms(),
            is_read: false,
            message: None,
            announcement: None,
        }
    }
}

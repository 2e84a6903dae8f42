//! Users, notification preferences and class groups.

use super::ValidationErrors;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

pub type UserId = Uuid;
pub type GroupId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const USERNAME_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Parent,
    Student,
    Teacher,
    Director,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Director => "director",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "parent" => Some(Self::Parent),
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "director" => Some(Self::Director),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub uuid: UserId,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
    pub is_staff: bool,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            role: None,
            is_staff: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("username", &self.username, USERNAME_MAX_CHARS);
        if self.username.chars().any(char::is_whitespace) {
            errors.add("username", "must not contain whitespace");
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            errors.add("email", "enter a valid email address");
        }
        errors.into_result()
    }
}

/// Per-user delivery settings.
///
/// [`NotificationPreference::default`] holds the values of a newly saved
/// row. Users without a stored row get no e-mail at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationPreference {
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub push_enabled: bool,
    pub notify_on_announcement: bool,
    pub notify_on_message: bool,
    pub daily_digest: bool,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        Self {
            email_enabled: true,
            sms_enabled: false,
            push_enabled: true,
            notify_on_announcement: true,
            notify_on_message: false,
            daily_digest: true,
        }
    }
}

impl NotificationPreference {
    pub fn wants_announcement_email(&self) -> bool {
        self.email_enabled && self.notify_on_announcement
    }

    pub fn wants_message_email(&self) -> bool {
        self.email_enabled && self.notify_on_message
    }
}

/// A class group such as "2nd ESO A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassGroup {
    pub uuid: GroupId,
    pub name: String,
    pub stage: String,
}

impl ClassGroup {
    pub fn new(name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            stage: stage.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("name", &self.name, 80);
        errors.limit_text("stage", &self.stage, 40);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationPreference, User};

    #[test]
    fn user_validation_flags_bad_email_and_blank_username() {
        let errors = User::new("  ", "not-an-email").validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(User::new("ana", "ana@school.example").validate().is_ok());
    }

    #[test]
    fn default_preference_emails_announcements_only() {
        let prefs = NotificationPreference::default();
        assert!(prefs.wants_announcement_email());
        assert!(!prefs.wants_message_email());

        let muted = NotificationPreference {
            email_enabled: false,
            notify_on_message: true,
            ..prefs
        };
        assert!(!muted.wants_announcement_email());
        assert!(!muted.wants_message_email());
    }
}

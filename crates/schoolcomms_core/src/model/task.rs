//! Personal tasks with due date and completion tracking.
//!
//! # Invariants
//! - `completed == completed_on.is_some()`.

use super::user::UserId;
use super::ValidationErrors;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

pub type TaskId = Uuid;

pub const TITLE_MAX_CHARS: usize = 150;

/// Due time used when the form leaves it blank.
pub fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub uuid: TaskId,
    /// `None` once the author account is removed.
    pub author: Option<UserId>,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub due_time: NaiveTime,
    pub completed: bool,
    pub completed_on: Option<NaiveDate>,
}

impl Task {
    pub fn new(author: UserId, title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            author: Some(author),
            title: title.into(),
            description: String::new(),
            due_date,
            due_time: default_due_time(),
            completed: false,
            completed_on: None,
        }
    }

    /// Marks the task done; the first completion date is kept on repeats.
    pub fn complete(&mut self, today: NaiveDate) {
        self.completed = true;
        if self.completed_on.is_none() {
            self.completed_on = Some(today);
        }
    }

    pub fn reopen(&mut self) {
        self.completed = false;
        self.completed_on = None;
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("title", &self.title, TITLE_MAX_CHARS);
        if self.completed != self.completed_on.is_some() {
            errors.add("completed", "completion flag and completion date disagree");
        }
        errors.into_result()
    }

    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "Completed"
        } else {
            "Pending"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Task;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn completion_date_follows_flag() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 10, d).unwrap();
        let mut task = Task::new(Uuid::new_v4(), "essay", day(20));

        task.complete(day(14));
        assert_eq!(task.completed_on, Some(day(14)));
        task.complete(day(15));
        assert_eq!(task.completed_on, Some(day(14)));
        task.reopen();
        assert_eq!(task.completed_on, None);
        assert!(task.validate().is_ok());
    }
}

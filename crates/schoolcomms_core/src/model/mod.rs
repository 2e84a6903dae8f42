//! Domain records persisted by the communication store.
//!
//! # Responsibility
//! - Define entity shapes, status enums and their string codes.
//! - Own form-level validation so every write path checks the same rules.
//!
//! # Invariants
//! - Every entity is identified by a random v4 UUID.
//! - Timestamps are Unix epoch milliseconds (UTC); calendar dates are `NaiveDate`.

pub mod announcement;
pub mod audit;
pub mod incident;
pub mod message;
pub mod notification;
pub mod task;
pub mod user;

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field errors found in one submission; never empty when returned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    /// `Ok(())` when nothing was added.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub(crate) fn require_text(&mut self, field: &'static str, value: &str, max_chars: usize) {
        if value.trim().is_empty() {
            self.add(field, "this field is required");
        } else {
            self.limit_text(field, value, max_chars);
        }
    }

    pub(crate) fn limit_text(&mut self, field: &'static str, value: &str, max_chars: usize) {
        if value.chars().count() > max_chars {
            self.add(field, format!("must be at most {max_chars} characters"));
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "validation failed ({})", fields.join("; "))
    }
}

impl Error for ValidationErrors {}

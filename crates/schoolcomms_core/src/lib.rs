//! Core domain logic for SchoolComms.
//! This crate is the single source of truth for business invariants.

pub mod api;
pub mod calendar;
pub mod config;
pub mod db;
pub mod logging;
pub mod mail;
pub mod model;
pub mod repo;
pub mod service;

pub use calendar::{CalendarError, DayClassification, DayReason, SchoolCalendar};
pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mail::{FileOutboxTransport, LogTransport, MailError, MailTransport, OutgoingMail};
pub use repo::{RepoError, RepoResult};
pub use service::{Actor, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

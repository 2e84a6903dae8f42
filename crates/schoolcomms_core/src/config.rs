//! Application configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe store, logging, mail and calendar settings in one file.
//! - Fill missing sections with defaults so partial files stay valid.
//! - Build the [`SchoolCalendar`] handed to calendar computations.
//!
//! Dates are written as quoted `YYYY-MM-DD` strings.

use crate::calendar::{CalendarError, SchoolCalendar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "schoolcomms";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Calendar(CalendarError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Calendar(err) => write!(f, "invalid calendar: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Calendar(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<CalendarError> for ConfigError {
    fn from(value: CalendarError) -> Self {
        Self::Calendar(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path; relative paths resolve against the working directory.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: app_dir().join("schoolcomms.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: app_dir().join("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from_address: String,
    /// Spool directory picked up by the external mail relay.
    pub outbox_dir: PathBuf,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "SchoolComms <no-reply@schoolcomms.local>".to_string(),
            outbox_dir: app_dir().join("outbox"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub term_start: NaiveDate,
    pub term_end: NaiveDate,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default)]
    pub vacations: Vec<DateRange>,
}

impl CalendarConfig {
    /// Validates ranges and builds the engine input.
    pub fn to_calendar(&self) -> Result<SchoolCalendar, CalendarError> {
        let calendar = SchoolCalendar::new(self.term_start, self.term_end)?
            .with_holidays(self.holidays.iter().copied());
        self.vacations
            .iter()
            .try_fold(calendar, |acc, range| acc.with_vacation_range(range.start, range.end))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub mail: MailConfig,
    /// `None` selects the built-in 2025/26 calendar.
    pub calendar: Option<CalendarConfig>,
}

impl AppConfig {
    /// Parses a TOML document; absent sections take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.school_calendar()?;
        Ok(config)
    }

    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// A missing file at the default location yields [`AppConfig::default`];
    /// a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(source) => Self::from_toml_str(&source),
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    pub fn school_calendar(&self) -> Result<SchoolCalendar, CalendarError> {
        match &self.calendar {
            Some(calendar) => calendar.to_calendar(),
            None => Ok(SchoolCalendar::default()),
        }
    }
}

/// `<config dir>/schoolcomms/config.toml`.
pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE_NAME)
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use crate::calendar::DayReason;
    use chrono::NaiveDate;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.calendar.is_none());
    }

    #[test]
    fn calendar_section_builds_alternate_calendar() {
        let config = AppConfig::from_toml_str(
            r#"
            [calendar]
            term_start = "2030-01-07"
            term_end = "2030-03-29"
            holidays = ["2030-01-08"]
            vacations = [{ start = "2030-02-11", end = "2030-02-15" }]
            "#,
        )
        .unwrap();

        let calendar = config.school_calendar().unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2030, 2, d).unwrap();
        assert_eq!(calendar.classify(day(12)).reason, DayReason::SchoolVacation);
        assert_eq!(
            calendar
                .classify(NaiveDate::from_ymd_opt(2030, 1, 8).unwrap())
                .reason,
            DayReason::OfficialHoliday
        );
    }

    #[test]
    fn inverted_term_is_a_config_error() {
        let err = AppConfig::from_toml_str(
            r#"
            [calendar]
            term_start = "2030-06-01"
            term_end = "2030-01-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Calendar(_)));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn partial_mail_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [mail]
            from_address = "office@school.example"
            "#,
        )
        .unwrap();
        assert_eq!(config.mail.from_address, "office@school.example");
        assert_eq!(config.database, AppConfig::default().database);
    }
}

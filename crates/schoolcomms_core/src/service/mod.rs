//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce who may read or change what (`Actor` checks).
//! - Trigger notification fan-out explicitly after creating writes.
//!
//! # Invariants
//! - Validation and authorization failures leave storage untouched.
//! - Service APIs never bypass repository validation/persistence contracts.

pub mod announcement_service;
pub mod dashboard_service;
pub mod incident_service;
pub mod message_service;
pub mod notifier;
pub mod summary_service;
pub mod task_service;
pub mod user_service;

use crate::model::audit::AuditEntry;
use crate::model::user::{User, UserId};
use crate::model::{EpochMillis, ValidationErrors};
use crate::repo::audit_repo::AuditRepository;
use crate::repo::RepoError;
use chrono::{Local, NaiveDate, TimeZone};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level failure surfaced to callers.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected; nothing was written.
    Validation(ValidationErrors),
    /// Actor lacks ownership or staff rights for `action`.
    Forbidden(&'static str),
    NotFound(Uuid),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Forbidden(action) => write!(f, "not allowed to {action}"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Forbidden(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(errors) => Self::Validation(errors),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// The authenticated caller of a use-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user: UserId,
    pub is_staff: bool,
}

impl Actor {
    pub fn new(user: UserId, is_staff: bool) -> Self {
        Self { user, is_staff }
    }

    /// Owner of the record, or staff.
    pub fn can_manage(&self, owner: Option<UserId>) -> bool {
        self.is_staff || owner == Some(self.user)
    }

    pub(crate) fn require_manage(
        &self,
        owner: Option<UserId>,
        action: &'static str,
    ) -> ServiceResult<()> {
        if self.can_manage(owner) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(action))
        }
    }

    pub(crate) fn require_staff(&self, action: &'static str) -> ServiceResult<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(action))
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.uuid, user.is_staff)
    }
}

/// Appends an audit entry; a failed append is logged, not raised.
pub(crate) fn record_audit<A: AuditRepository>(
    audit: &A,
    actor: Actor,
    action: &str,
    metadata: serde_json::Value,
) {
    let entry = AuditEntry::new(Some(actor.user), action).with_metadata(metadata);
    if let Err(err) = audit.append(&entry) {
        warn!("event=audit_append module=service status=error action={action} error={err}");
    }
}

/// Epoch milliseconds of local midnight starting `date`.
pub fn local_day_start_ms(date: NaiveDate) -> EpochMillis {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.timestamp_millis(),
        None => midnight.and_utc().timestamp_millis(),
    }
}

/// Local calendar date of an epoch-millisecond timestamp.
pub fn local_date_of(ms: EpochMillis) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|local| local.date_naive())
}

#[cfg(test)]
mod tests {
    use super::{local_date_of, local_day_start_ms, Actor};
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn owner_and_staff_can_manage() {
        let owner = Uuid::new_v4();
        assert!(Actor::new(owner, false).can_manage(Some(owner)));
        assert!(Actor::new(Uuid::new_v4(), true).can_manage(Some(owner)));
        assert!(!Actor::new(Uuid::new_v4(), false).can_manage(Some(owner)));
        assert!(!Actor::new(owner, false).can_manage(None));
    }

    #[test]
    fn local_day_bounds_round_trip() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        let start = local_day_start_ms(day);
        assert_eq!(local_date_of(start), Some(day));
        assert_eq!(local_date_of(start - 1), day.pred_opt());
    }
}

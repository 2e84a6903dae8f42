//! Announcement use-cases.
//!
//! # Responsibility
//! - Create announcements and trigger their fan-out.
//! - Provide visibility-scoped listing, search and read tracking.
//!
//! # Invariants
//! - Announcement, receipts and notifications commit together; e-mail goes
//!   out only afterwards.
//! - Only the author or staff may edit or delete.

use super::notifier::Notifier;
use super::{local_day_start_ms, record_audit, Actor, ServiceError, ServiceResult};
use crate::model::announcement::{Announcement, AnnouncementId};
use crate::model::user::{GroupId, UserId};
use crate::model::ValidationErrors;
use crate::repo::announcement_repo::{AnnouncementQuery, AnnouncementRepository};
use crate::repo::audit_repo::AuditRepository;
use crate::repo::mail_log_repo::MailLogRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{Page, Paged};
use chrono::NaiveDate;
use log::info;
use serde_json::json;

pub const SEARCH_PAGE_SIZE: u32 = 10;
pub const LATEST_LIMIT: u32 = 10;

/// Form input for creating or editing an announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
    pub recipients: Vec<UserId>,
    pub target_groups: Vec<GroupId>,
}

/// Search form for the announcement list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementFilter {
    pub title: Option<String>,
    pub group: Option<GroupId>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive.
    pub date_to: Option<NaiveDate>,
}

pub struct AnnouncementService<'t, R, A, U, L>
where
    R: AnnouncementRepository,
    A: AuditRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    repo: R,
    audit: A,
    notifier: Notifier<'t, U, L>,
}

impl<'t, R, A, U, L> AnnouncementService<'t, R, A, U, L>
where
    R: AnnouncementRepository,
    A: AuditRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    pub fn new(repo: R, audit: A, notifier: Notifier<'t, U, L>) -> Self {
        Self {
            repo,
            audit,
            notifier,
        }
    }

    /// Creates the announcement and fans it out to its audience.
    pub fn create(&self, actor: Actor, draft: AnnouncementDraft) -> ServiceResult<Announcement> {
        let mut announcement = Announcement::new(actor.user, draft.title, draft.content);
        announcement.recipients = dedup(draft.recipients);
        announcement.target_groups = dedup(draft.target_groups);
        self.validate_targets(&announcement)?;

        let author = self
            .notifier
            .users()
            .get_user(actor.user)?
            .ok_or(ServiceError::NotFound(actor.user))?;
        let audience = self.notifier.announcement_audience(&announcement)?;
        let notifications = self
            .notifier
            .announcement_notifications(&announcement, &audience);
        let receipt_users: Vec<UserId> = audience.iter().map(|user| user.uuid).collect();

        self.repo
            .create_announcement(&announcement, &receipt_users, &notifications)?;
        record_audit(
            &self.audit,
            actor,
            "announcement.create",
            json!({
                "announcement": announcement.uuid,
                "recipients": receipt_users.len(),
            }),
        );

        let emailed = self
            .notifier
            .email_announcement(&announcement, &author, &audience);
        info!(
            "event=announcement_create module=service status=ok recipients={} emailed={emailed}",
            audience.len()
        );
        Ok(announcement)
    }

    pub fn get(&self, id: AnnouncementId) -> ServiceResult<Announcement> {
        self.repo
            .get_announcement(id)?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Announcements authored by or addressed to the actor, newest first.
    pub fn list_visible(&self, actor: Actor, page: u32) -> ServiceResult<Paged<Announcement>> {
        let query = AnnouncementQuery {
            visible_to: Some(actor.user),
            ..AnnouncementQuery::default()
        };
        Ok(self.repo.search(&query, Page::new(page, SEARCH_PAGE_SIZE))?)
    }

    pub fn latest(&self, actor: Actor) -> ServiceResult<Vec<Announcement>> {
        let query = AnnouncementQuery {
            visible_to: Some(actor.user),
            ..AnnouncementQuery::default()
        };
        Ok(self.repo.search(&query, Page::new(1, LATEST_LIMIT))?.items)
    }

    /// Filtered search; staff search every announcement.
    pub fn search(
        &self,
        actor: Actor,
        filter: &AnnouncementFilter,
        page: u32,
    ) -> ServiceResult<Paged<Announcement>> {
        let query = AnnouncementQuery {
            visible_to: (!actor.is_staff).then_some(actor.user),
            author: None,
            title_contains: filter.title.clone(),
            group: filter.group,
            created_from: filter.date_from.map(local_day_start_ms),
            created_before: filter
                .date_to
                .and_then(|date| date.succ_opt())
                .map(local_day_start_ms),
        };
        Ok(self.repo.search(&query, Page::new(page, SEARCH_PAGE_SIZE))?)
    }

    /// Replaces title, content and targets. No new fan-out is triggered.
    pub fn update(
        &self,
        actor: Actor,
        id: AnnouncementId,
        draft: AnnouncementDraft,
    ) -> ServiceResult<Announcement> {
        let mut announcement = self.get(id)?;
        actor.require_manage(Some(announcement.author), "edit this announcement")?;

        announcement.title = draft.title;
        announcement.content = draft.content;
        announcement.recipients = dedup(draft.recipients);
        announcement.target_groups = dedup(draft.target_groups);
        self.validate_targets(&announcement)?;

        self.repo.update_announcement(&announcement)?;
        record_audit(
            &self.audit,
            actor,
            "announcement.update",
            json!({ "announcement": id }),
        );
        Ok(announcement)
    }

    pub fn delete(&self, actor: Actor, id: AnnouncementId) -> ServiceResult<()> {
        let announcement = self.get(id)?;
        actor.require_manage(Some(announcement.author), "delete this announcement")?;
        self.repo.delete_announcement(id)?;
        record_audit(
            &self.audit,
            actor,
            "announcement.delete",
            json!({ "announcement": id }),
        );
        Ok(())
    }

    /// Marks every unread receipt of the actor as read; repeat calls are
    /// no-ops. Returns how many receipts changed.
    pub fn mark_all_read(&self, actor: Actor) -> ServiceResult<usize> {
        let changed = self.repo.mark_all_read(actor.user)?;
        if changed > 0 {
            record_audit(
                &self.audit,
                actor,
                "announcement.mark_all_read",
                json!({ "changed": changed }),
            );
        }
        Ok(changed)
    }

    pub fn unread_count(&self, actor: Actor) -> ServiceResult<u64> {
        Ok(self.repo.count_unread(actor.user)?)
    }

    fn validate_targets(&self, announcement: &Announcement) -> ServiceResult<()> {
        let mut errors = match announcement.validate() {
            Ok(()) => ValidationErrors::default(),
            Err(errors) => errors,
        };
        let users = self.notifier.users();
        for id in &announcement.recipients {
            if users.get_user(*id)?.is_none() {
                errors.add("recipients", format!("unknown user {id}"));
            }
        }
        for id in &announcement.target_groups {
            if users.get_group(*id)?.is_none() {
                errors.add("target_groups", format!("unknown group {id}"));
            }
        }
        Ok(errors.into_result()?)
    }
}

fn dedup<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

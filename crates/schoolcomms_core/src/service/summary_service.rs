//! Daily announcement digest for class tutors.
//!
//! Triggered once per day by an external scheduler through the
//! `daily-summary` command; retries are the scheduler's concern.

use super::local_day_start_ms;
use super::notifier::Notifier;
use super::ServiceResult;
use crate::mail::templates::{render_html, DailySummaryEmail, SummaryItem};
use crate::model::announcement::Announcement;
use crate::model::user::GroupId;
use crate::repo::announcement_repo::{AnnouncementQuery, AnnouncementRepository};
use crate::repo::mail_log_repo::MailLogRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::Page;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUMMARY_SUBJECT: &str = "Daily announcement summary";

const SCAN_PAGE_SIZE: u32 = 100;

/// Outcome of one summary run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub date: Option<NaiveDate>,
    pub announcements: usize,
    pub groups_sent: usize,
    /// Groups without any tutor e-mail address.
    pub groups_skipped: usize,
    pub groups_failed: usize,
}

pub struct SummaryService<'t, R, U, L>
where
    R: AnnouncementRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    announcements: R,
    notifier: Notifier<'t, U, L>,
}

impl<'t, R, U, L> SummaryService<'t, R, U, L>
where
    R: AnnouncementRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    pub fn new(announcements: R, notifier: Notifier<'t, U, L>) -> Self {
        Self {
            announcements,
            notifier,
        }
    }

    /// Sends one digest per target group of the announcements created on
    /// `today` (local time) to that group's tutors.
    pub fn send_daily_summary(&self, today: NaiveDate) -> ServiceResult<SummaryReport> {
        let created = self.created_on(today)?;
        let mut by_group: BTreeMap<GroupId, Vec<&Announcement>> = BTreeMap::new();
        for announcement in &created {
            for group in &announcement.target_groups {
                by_group.entry(*group).or_default().push(announcement);
            }
        }

        let mut report = SummaryReport {
            date: Some(today),
            announcements: created.len(),
            ..SummaryReport::default()
        };
        let users = self.notifier.users();
        for (group_id, items) in by_group {
            let Some(group) = users.get_group(group_id)? else {
                continue;
            };
            let mut emails: Vec<String> = Vec::new();
            for tutor in users.group_tutors(group_id)? {
                let email = tutor.email.trim().to_string();
                if !email.is_empty() && !emails.contains(&email) {
                    emails.push(email);
                }
            }
            if emails.is_empty() {
                info!("event=daily_summary_group module=service status=skipped reason=no_tutors");
                report.groups_skipped += 1;
                continue;
            }

            let body = render_html(&DailySummaryEmail {
                group_name: &group.name,
                date: today.format("%d/%m/%Y").to_string(),
                items: items
                    .iter()
                    .map(|announcement| SummaryItem {
                        title: announcement.title.clone(),
                        content: announcement.content.clone(),
                    })
                    .collect(),
            });
            let reference = format!("daily_summary:{group_id}:{today}");
            if self
                .notifier
                .submit_many(emails, SUMMARY_SUBJECT, body, &reference)
            {
                report.groups_sent += 1;
            } else {
                report.groups_failed += 1;
            }
        }

        info!(
            "event=daily_summary module=service status=ok announcements={} sent={} skipped={} failed={}",
            report.announcements, report.groups_sent, report.groups_skipped, report.groups_failed
        );
        Ok(report)
    }

    fn created_on(&self, day: NaiveDate) -> ServiceResult<Vec<Announcement>> {
        let query = AnnouncementQuery {
            created_from: Some(local_day_start_ms(day)),
            created_before: day.succ_opt().map(local_day_start_ms),
            ..AnnouncementQuery::default()
        };
        let mut collected = Vec::new();
        let mut page_number = 1;
        loop {
            let page = self
                .announcements
                .search(&query, Page::new(page_number, SCAN_PAGE_SIZE))?;
            let has_next = page.has_next();
            collected.extend(page.items);
            if !has_next {
                break;
            }
            page_number += 1;
        }
        Ok(collected)
    }
}

//! Dashboard view-model aggregation.
//!
//! # Responsibility
//! - Assemble the per-user dashboard from tasks, announcements, messages,
//!   incidents, notifications and the school calendar.
//!
//! # Invariants
//! - Read-only: building a dashboard never writes.
//! - Entity slices hold at most 5 rows; notifications at most 20.
//! - Output is deterministic for a given store state and `today`.

use super::{ServiceError, ServiceResult};
use crate::calendar::attendance::{simulate_attendance, AttendanceReport};
use crate::calendar::grade::{dashboard_grades, SubjectGrade};
use crate::calendar::SchoolCalendar;
use crate::model::announcement::Announcement;
use crate::model::incident::Incident;
use crate::model::message::PrivateMessage;
use crate::model::notification::Notification;
use crate::model::task::Task;
use crate::model::user::UserId;
use crate::repo::announcement_repo::{
    AnnouncementQuery, AnnouncementRepository, SqliteAnnouncementRepository,
};
use crate::repo::incident_repo::{IncidentRepository, SqliteIncidentRepository};
use crate::repo::message_repo::{MessageRepository, SqliteMessageRepository};
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::Page;
use chrono::{Datelike, NaiveDate, Weekday};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;

pub const SLICE_LIMIT: u32 = 5;
pub const NOTIFICATION_LIMIT: u32 = 20;
pub const RECENT_SCHOOL_DAYS: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub tasks_total: u64,
    pub tasks_completed: u64,
    /// Completed share of all tasks, truncated to a whole percent.
    pub progress_percent: u64,
    pub unread_messages: u64,
    pub unread_announcements: u64,
}

/// Entity total shown in the activity chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityTotal {
    pub label: &'static str,
    pub value: u64,
}

/// Completed tasks on one recent school day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    /// e.g. `Tuesday 14/10`.
    pub label: String,
    pub completed_tasks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    pub title: &'static str,
    pub icon: &'static str,
    /// Never empty: a fallback line replaces an empty list.
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub user: UserId,
    pub today: NaiveDate,
    pub iso_week: u32,
    pub tasks: Vec<Task>,
    pub announcements: Vec<Announcement>,
    pub unread_messages: Vec<PrivateMessage>,
    pub incidents: Vec<Incident>,
    pub notifications: Vec<Notification>,
    pub counts: DashboardCounts,
    pub activity_totals: Vec<ActivityTotal>,
    pub attendance: AttendanceReport,
    pub grades: Vec<SubjectGrade>,
    pub recent_activity: Vec<DailyActivity>,
    pub days_since_term_start: i64,
    pub school_days_counted: usize,
    pub cards: Vec<SummaryCard>,
}

/// Builds dashboards straight from the store.
pub struct DashboardService<'conn> {
    conn: &'conn Connection,
    calendar: &'conn SchoolCalendar,
}

impl<'conn> DashboardService<'conn> {
    pub fn new(conn: &'conn Connection, calendar: &'conn SchoolCalendar) -> Self {
        Self { conn, calendar }
    }

    pub fn build(&self, user: UserId, today: NaiveDate) -> ServiceResult<DashboardView> {
        let started_at = Instant::now();
        let users = SqliteUserRepository::new(self.conn);
        if users.get_user(user)?.is_none() {
            return Err(ServiceError::NotFound(user));
        }
        let tasks_repo = SqliteTaskRepository::new(self.conn);
        let announcements_repo = SqliteAnnouncementRepository::new(self.conn);
        let messages_repo = SqliteMessageRepository::new(self.conn);
        let incidents_repo = SqliteIncidentRepository::new(self.conn);
        let notifications_repo = SqliteNotificationRepository::new(self.conn);

        let tasks = tasks_repo.latest_by_author(user, SLICE_LIMIT)?;
        let authored = announcements_repo.search(
            &AnnouncementQuery {
                author: Some(user),
                ..AnnouncementQuery::default()
            },
            Page::new(1, SLICE_LIMIT),
        )?;
        let unread_messages = messages_repo.unread_for(user, Some(SLICE_LIMIT))?;
        let incidents = incidents_repo.list(Some(user), Some(SLICE_LIMIT))?;
        let notifications = notifications_repo.list_unread(user, NOTIFICATION_LIMIT)?;

        let task_counts = tasks_repo.counts_by_author(user)?;
        let counts = DashboardCounts {
            tasks_total: task_counts.total,
            tasks_completed: task_counts.completed,
            progress_percent: progress_percent(task_counts.completed, task_counts.total),
            unread_messages: messages_repo.count_unread(user)?,
            unread_announcements: announcements_repo.count_unread(user)?,
        };
        let activity_totals = vec![
            ActivityTotal {
                label: "Announcements",
                value: authored.total,
            },
            ActivityTotal {
                label: "Messages",
                value: messages_repo.count_received(user)?,
            },
            ActivityTotal {
                label: "Tasks",
                value: task_counts.total,
            },
            ActivityTotal {
                label: "Incidents",
                value: incidents_repo.count_by_author(user)?,
            },
        ];

        let recent_days = self.calendar.recent_school_days(RECENT_SCHOOL_DAYS, today);
        let recent_activity = match (recent_days.first(), recent_days.last()) {
            (Some(first), Some(last)) => {
                let per_day = tasks_repo.completed_per_day(user, *first, *last)?;
                recent_days
                    .iter()
                    .map(|day| DailyActivity {
                        date: *day,
                        label: day_label(*day),
                        completed_tasks: per_day.get(day).copied().unwrap_or(0),
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        let mut message_items = Vec::with_capacity(unread_messages.len());
        for message in &unread_messages {
            let sender = users
                .get_user(message.sender)?
                .map(|sender| sender.username)
                .unwrap_or_else(|| "Unknown".to_string());
            message_items.push(format!("{sender}: {}", message.subject));
        }
        let cards = vec![
            card(
                "Announcements",
                "fa-bullhorn",
                authored.items.iter().map(|a| a.title.clone()).collect(),
                "No announcements",
            ),
            card("Messages", "fa-envelope", message_items, "No messages"),
            card(
                "Tasks",
                "fa-tasks",
                tasks
                    .iter()
                    .map(|task| format!("{} - {}", task.title, task.status_label()))
                    .collect(),
                "No tasks",
            ),
            card(
                "Incidents",
                "fa-triangle-exclamation",
                incidents.iter().map(Incident::summary).collect(),
                "No incidents",
            ),
        ];

        let iso_week = today.iso_week().week();
        let view = DashboardView {
            user,
            today,
            iso_week,
            tasks,
            announcements: authored.items,
            unread_messages,
            incidents,
            notifications,
            counts,
            activity_totals,
            attendance: simulate_attendance(self.calendar, today),
            grades: dashboard_grades(iso_week),
            recent_activity,
            days_since_term_start: self.calendar.days_since_term_start(today),
            school_days_counted: self.calendar.count_school_days(today),
            cards,
        };

        info!(
            "event=dashboard_build module=service status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(view)
    }
}

fn progress_percent(completed: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        completed.saturating_mul(100) / total
    }
}

fn day_label(day: NaiveDate) -> String {
    let name = match day.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    };
    format!("{name} {}", day.format("%d/%m"))
}

fn card(
    title: &'static str,
    icon: &'static str,
    items: Vec<String>,
    fallback: &str,
) -> SummaryCard {
    let items = if items.is_empty() {
        vec![fallback.to_string()]
    } else {
        items
    };
    SummaryCard { title, icon, items }
}

#[cfg(test)]
mod tests {
    use super::{card, day_label, progress_percent};
    use chrono::NaiveDate;

    #[test]
    fn progress_truncates_and_handles_no_tasks() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(2, 3), 66);
        assert_eq!(progress_percent(3, 3), 100);
    }

    #[test]
    fn day_labels_use_weekday_and_short_date() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        assert_eq!(day_label(day), "Tuesday 14/10");
    }

    #[test]
    fn empty_cards_fall_back() {
        assert_eq!(
            card("Tasks", "fa-tasks", Vec::new(), "No tasks").items,
            vec!["No tasks".to_string()]
        );
    }
}

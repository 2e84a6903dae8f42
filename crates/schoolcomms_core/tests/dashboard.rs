mod test_support;

use chrono::NaiveDate;
use schoolcomms_core::calendar::grade::DASHBOARD_SUBJECTS;
use schoolcomms_core::model::incident::IncidentCategory;
use schoolcomms_core::repo::audit_repo::SqliteAuditRepository;
use schoolcomms_core::repo::incident_repo::SqliteIncidentRepository;
use schoolcomms_core::repo::task_repo::SqliteTaskRepository;
use schoolcomms_core::service::announcement_service::AnnouncementDraft;
use schoolcomms_core::service::dashboard_service::DashboardService;
use schoolcomms_core::service::incident_service::IncidentService;
use schoolcomms_core::service::task_service::{TaskDraft, TaskService};
use schoolcomms_core::{SchoolCalendar, ServiceError};
use test_support::{actor, add_user, announcement_service, message_service, open, RecordingTransport};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn calendar() -> SchoolCalendar {
    SchoolCalendar::new(date(2025, 9, 8), date(2026, 6, 19))
        .unwrap()
        .with_holidays([date(2025, 10, 13)])
}

#[test]
fn empty_dashboard_uses_fallback_cards_and_zero_counts() {
    let conn = open();
    let calendar = calendar();
    let student = add_user(&conn, "student", false);

    let view = DashboardService::new(&conn, &calendar)
        .build(student.uuid, date(2025, 10, 14))
        .unwrap();

    assert_eq!(view.counts.tasks_total, 0);
    assert_eq!(view.counts.progress_percent, 0);
    assert!(view.notifications.is_empty());
    let fallbacks: Vec<&str> = view
        .cards
        .iter()
        .map(|card| card.items[0].as_str())
        .collect();
    assert_eq!(
        fallbacks,
        vec!["No announcements", "No messages", "No tasks", "No incidents"]
    );
    assert_eq!(view.iso_week, 42);
    assert_eq!(view.grades.len(), DASHBOARD_SUBJECTS.len());
    assert_eq!(view.days_since_term_start, 36);
    assert_eq!(view.school_days_counted, 26);
    assert_eq!(view.attendance.totals.school_days, 26);
    assert_eq!(
        view.attendance.totals.present + view.attendance.totals.absent,
        26
    );
}

#[test]
fn slices_are_capped_and_counts_cover_everything() {
    let conn = open();
    let calendar = calendar();
    let transport = RecordingTransport::default();
    let student = add_user(&conn, "student", false);
    let teacher = add_user(&conn, "teacher", false);
    let today = date(2025, 10, 14);

    let tasks = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteAuditRepository::new(&conn),
    );
    let mut created = Vec::new();
    for day in 0..7 {
        let task = tasks
            .create(
                actor(&student),
                TaskDraft {
                    title: format!("Task {day}"),
                    description: String::new(),
                    due_date: date(2025, 10, 15 + day),
                    due_time: None,
                },
            )
            .unwrap();
        created.push(task);
    }
    tasks.complete(actor(&student), created[0].uuid, today).unwrap();
    tasks.complete(actor(&student), created[1].uuid, today).unwrap();
    tasks
        .complete(actor(&student), created[2].uuid, date(2025, 10, 10))
        .unwrap();

    let messages = message_service(&conn, &transport);
    for index in 0..22 {
        messages
            .send(actor(&teacher), student.uuid, format!("Note {index}"), "Body")
            .unwrap();
    }

    let incidents = IncidentService::new(
        SqliteIncidentRepository::new(&conn),
        SqliteAuditRepository::new(&conn),
    );
    for index in 0..6 {
        incidents
            .report(
                actor(&student),
                format!("Broken chair {index}"),
                "Classroom 3.",
                IncidentCategory::Other,
            )
            .unwrap();
    }

    let announcements = announcement_service(&conn, &transport);
    for index in 0..6 {
        announcements
            .create(
                actor(&student),
                AnnouncementDraft {
                    title: format!("Club meeting {index}"),
                    content: "Room 5 at noon.".to_string(),
                    recipients: vec![teacher.uuid],
                    target_groups: Vec::new(),
                },
            )
            .unwrap();
    }

    let view = DashboardService::new(&conn, &calendar)
        .build(student.uuid, today)
        .unwrap();

    assert_eq!(view.tasks.len(), 5);
    assert_eq!(view.tasks[0].title, "Task 6");
    assert_eq!(view.unread_messages.len(), 5);
    assert_eq!(view.incidents.len(), 5);
    assert_eq!(view.announcements.len(), 5);
    assert_eq!(view.notifications.len(), 20);

    assert_eq!(view.counts.tasks_total, 7);
    assert_eq!(view.counts.tasks_completed, 3);
    assert_eq!(view.counts.progress_percent, 42);
    assert_eq!(view.counts.unread_messages, 22);
    assert_eq!(view.counts.unread_announcements, 0);

    let totals: Vec<(&str, u64)> = view
        .activity_totals
        .iter()
        .map(|total| (total.label, total.value))
        .collect();
    assert_eq!(
        totals,
        vec![
            ("Announcements", 6),
            ("Messages", 22),
            ("Tasks", 7),
            ("Incidents", 6)
        ]
    );

    let days: Vec<NaiveDate> = view.recent_activity.iter().map(|day| day.date).collect();
    assert_eq!(
        days,
        vec![
            date(2025, 10, 3),
            date(2025, 10, 6),
            date(2025, 10, 7),
            date(2025, 10, 8),
            date(2025, 10, 9),
            date(2025, 10, 10),
            date(2025, 10, 14),
        ]
    );
    let last = view.recent_activity.last().unwrap();
    assert_eq!(last.label, "Tuesday 14/10");
    assert_eq!(last.completed_tasks, 2);
    assert_eq!(view.recent_activity[5].completed_tasks, 1);
    assert_eq!(view.recent_activity[0].completed_tasks, 0);

    let message_card = &view.cards[1];
    assert_eq!(message_card.items.len(), 5);
    assert!(message_card.items[0].starts_with("teacher: Note"));
    assert_eq!(view.cards[2].items.len(), 5);
}

#[test]
fn unknown_user_is_not_found() {
    let conn = open();
    let calendar = calendar();
    let err = DashboardService::new(&conn, &calendar)
        .build(uuid::Uuid::new_v4(), date(2025, 10, 14))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

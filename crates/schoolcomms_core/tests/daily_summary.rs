mod test_support;

use chrono::Local;
use schoolcomms_core::repo::announcement_repo::SqliteAnnouncementRepository;
use schoolcomms_core::repo::mail_log_repo::{MailLogRepository, MailStatus, SqliteMailLogRepository};
use schoolcomms_core::service::announcement_service::AnnouncementDraft;
use schoolcomms_core::service::summary_service::{SummaryService, SUMMARY_SUBJECT};
use test_support::{actor, add_group, add_user, announcement_service, notifier, open, RecordingTransport};
use uuid::Uuid;

fn announce(conn: &rusqlite::Connection, author: &schoolcomms_core::model::user::User, title: &str, groups: Vec<Uuid>) {
    let transport = RecordingTransport::default();
    announcement_service(conn, &transport)
        .create(
            actor(author),
            AnnouncementDraft {
                title: title.to_string(),
                content: format!("Details about {title}."),
                recipients: Vec::new(),
                target_groups: groups,
            },
        )
        .unwrap();
}

#[test]
fn one_digest_per_group_goes_to_all_tutors() {
    let conn = open();
    let director = add_user(&conn, "director", true);
    let tutor_a = add_user(&conn, "tutor_a", false);
    let tutor_b = add_user(&conn, "tutor_b", false);
    let student = add_user(&conn, "student", false);
    let tutored = add_group(&conn, "2nd ESO A", &[&student], &[&tutor_a, &tutor_b]);
    let untutored = add_group(&conn, "2nd ESO B", &[&student], &[]);

    announce(&conn, &director, "Sports day", vec![tutored.uuid, untutored.uuid]);
    announce(&conn, &director, "Parent meeting", vec![tutored.uuid]);
    announce(&conn, &director, "Staff only", Vec::new());

    let transport = RecordingTransport::default();
    let today = Local::now().date_naive();
    let report = SummaryService::new(
        SqliteAnnouncementRepository::new(&conn),
        notifier(&conn, &transport),
    )
    .send_daily_summary(today)
    .unwrap();

    assert_eq!(report.date, Some(today));
    assert_eq!(report.announcements, 3);
    assert_eq!(report.groups_sent, 1);
    assert_eq!(report.groups_skipped, 1);
    assert_eq!(report.groups_failed, 0);

    let sent = transport.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, SUMMARY_SUBJECT);
    let mut to = sent[0].to.clone();
    to.sort();
    assert_eq!(
        to,
        vec!["tutor_a@school.test".to_string(), "tutor_b@school.test".to_string()]
    );
    assert!(sent[0].html_body.contains("Sports day"));
    assert!(sent[0].html_body.contains("Parent meeting"));
    assert!(!sent[0].html_body.contains("Staff only"));
    assert!(sent[0].html_body.contains("2nd ESO A"));

    let log = SqliteMailLogRepository::new(&conn)
        .list_for_reference(&format!("daily_summary:{}:{today}", tutored.uuid))
        .unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.status == MailStatus::Sent));
}

#[test]
fn other_days_send_nothing() {
    let conn = open();
    let director = add_user(&conn, "director", true);
    let tutor = add_user(&conn, "tutor", false);
    let group = add_group(&conn, "1st ESO A", &[], &[&tutor]);
    announce(&conn, &director, "Sports day", vec![group.uuid]);

    let transport = RecordingTransport::default();
    let yesterday = Local::now().date_naive().pred_opt().unwrap();
    let report = SummaryService::new(
        SqliteAnnouncementRepository::new(&conn),
        notifier(&conn, &transport),
    )
    .send_daily_summary(yesterday)
    .unwrap();

    assert_eq!(report.announcements, 0);
    assert_eq!(report.groups_sent, 0);
    assert!(transport.sent.borrow().is_empty());
}

#[test]
fn delivery_failures_are_counted_not_raised() {
    let conn = open();
    let director = add_user(&conn, "director", true);
    let tutor = add_user(&conn, "tutor", false);
    let group = add_group(&conn, "1st ESO A", &[], &[&tutor]);
    announce(&conn, &director, "Sports day", vec![group.uuid]);

    let transport = RecordingTransport::failing();
    let today = Local::now().date_naive();
    let report = SummaryService::new(
        SqliteAnnouncementRepository::new(&conn),
        notifier(&conn, &transport),
    )
    .send_daily_summary(today)
    .unwrap();

    assert_eq!(report.groups_failed, 1);
    let log = SqliteMailLogRepository::new(&conn)
        .list_for_reference(&format!("daily_summary:{}:{today}", group.uuid))
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, MailStatus::Failed);
}

mod test_support;

use regex::Regex;
use schoolcomms_core::api::{latest_notifications, mark_notifications_read};
use schoolcomms_core::model::notification::{Notification, NotificationKind};
use schoolcomms_core::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use serde_json::json;
use test_support::{add_user, open};

#[test]
fn latest_notifications_returns_at_most_twenty_in_stable_shape() {
    let conn = open();
    let parent = add_user(&conn, "parent", false);
    let repo = SqliteNotificationRepository::new(&conn);
    for index in 0..25 {
        let mut notification = Notification::new(
            parent.uuid,
            NotificationKind::Info,
            format!("Notice {index}"),
            "Body",
        );
        notification.created_at += index;
        repo.create_notification(&notification).unwrap();
    }

    let body = latest_notifications(&conn, parent.uuid).unwrap();
    let items = body["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 20);

    let first = &items[0];
    assert_eq!(first["title"], "Notice 24");
    assert_eq!(first["kind"], "info");
    assert_eq!(first["content"], "Body");
    assert_eq!(first["read"], false);
    assert!(first["url"].is_null());
    assert!(first["id"].as_str().is_some());
    let created = Regex::new(r"^\d{2}/\d{2}/\d{4} \d{2}:\d{2}$").unwrap();
    assert!(created.is_match(first["created"].as_str().unwrap()));
}

#[test]
fn mark_read_reports_success_and_is_repeatable() {
    let conn = open();
    let parent = add_user(&conn, "parent", false);
    let other = add_user(&conn, "other", false);
    let repo = SqliteNotificationRepository::new(&conn);
    repo.create_notification(&Notification::new(
        parent.uuid,
        NotificationKind::Warning,
        "Late fee",
        "Pay by Friday",
    ))
    .unwrap();
    repo.create_notification(&Notification::new(
        other.uuid,
        NotificationKind::Info,
        "Untouched",
        "Still unread",
    ))
    .unwrap();

    assert_eq!(
        mark_notifications_read(&conn, parent.uuid).unwrap(),
        json!({ "success": true })
    );
    assert_eq!(repo.count_unread(parent.uuid).unwrap(), 0);
    assert_eq!(repo.count_unread(other.uuid).unwrap(), 1);
    assert_eq!(
        mark_notifications_read(&conn, parent.uuid).unwrap(),
        json!({ "success": true })
    );

    let body = latest_notifications(&conn, parent.uuid).unwrap();
    assert_eq!(body["notifications"][0]["read"], true);
}

#[test]
fn user_without_notifications_gets_an_empty_list() {
    let conn = open();
    let parent = add_user(&conn, "parent", false);
    assert_eq!(
        latest_notifications(&conn, parent.uuid).unwrap(),
        json!({ "notifications": [] })
    );
}

//! JSON status endpoints polled by the front-end.
//!
//! # Responsibility
//! - Expose the notification badge feed and its "mark read" action as
//!   ready-to-serve JSON values.
//!
//! # Invariants
//! - Response shapes are stable; field names never change meaning.
//! - Timestamps render in local time as `dd/mm/YYYY HH:MM`.

use crate::model::notification::Notification;
use crate::model::user::UserId;
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::RepoResult;
use chrono::{Local, TimeZone};
use log::info;
use rusqlite::Connection;
use serde_json::{json, Value};

pub const LATEST_NOTIFICATIONS_LIMIT: u32 = 20;

/// Latest notifications of `user`, newest first.
///
/// # Contract
/// - Shape: `{"notifications":[{id, kind, title, content, url, read, created}]}`.
/// - At most 20 items, read and unread alike.
pub fn latest_notifications(conn: &Connection, user: UserId) -> RepoResult<Value> {
    let repo = SqliteNotificationRepository::new(conn);
    let items: Vec<Value> = repo
        .list_latest(user, LATEST_NOTIFICATIONS_LIMIT)?
        .iter()
        .map(notification_json)
        .collect();
    Ok(json!({ "notifications": items }))
}

/// Marks every notification of `user` read.
///
/// # Contract
/// - Always answers `{"success": true}` once the update committed.
/// - Repeat calls are harmless.
pub fn mark_notifications_read(conn: &Connection, user: UserId) -> RepoResult<Value> {
    let changed = SqliteNotificationRepository::new(conn).mark_all_read(user)?;
    info!("event=notifications_mark_read module=api status=ok changed={changed}");
    Ok(json!({ "success": true }))
}

fn notification_json(notification: &Notification) -> Value {
    json!({
        "id": notification.uuid.to_string(),
        "kind": notification.kind.as_str(),
        "title": notification.title,
        "content": notification.content,
        "url": notification.url,
        "read": notification.is_read,
        "created": format_created(notification.created_at),
    })
}

fn format_created(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|local| local.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

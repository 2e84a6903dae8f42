//! In-app notification repository.

use super::{bool_to_int, parse_bool, parse_opt_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::notification::{Notification, NotificationKind};
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    uuid,
    user_uuid,
    kind,
    title,
    content,
    url,
    created_at,
    is_read,
    message_uuid,
    announcement_uuid
FROM notifications";

pub trait NotificationRepository {
    fn create_notification(&self, notification: &Notification) -> RepoResult<()>;
    /// Unread notifications for `user`, newest first.
    fn list_unread(&self, user: UserId, limit: u32) -> RepoResult<Vec<Notification>>;
    /// All notifications for `user`, newest first.
    fn list_latest(&self, user: UserId, limit: u32) -> RepoResult<Vec<Notification>>;
    fn count_unread(&self, user: UserId) -> RepoResult<u64>;
    /// Returns how many rows flipped from unread to read.
    fn mark_all_read(&self, user: UserId) -> RepoResult<usize>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, user: UserId, limit: u32) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params![user.to_string(), i64::from(limit)])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &Notification) -> RepoResult<()> {
        insert_notification(self.conn, notification)
    }

    fn list_unread(&self, user: UserId, limit: u32) -> RepoResult<Vec<Notification>> {
        self.query(
            &format!(
                "{NOTIFICATION_SELECT_SQL}
                 WHERE user_uuid = ?1 AND is_read = 0
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2;"
            ),
            user,
            limit,
        )
    }

    fn list_latest(&self, user: UserId, limit: u32) -> RepoResult<Vec<Notification>> {
        self.query(
            &format!(
                "{NOTIFICATION_SELECT_SQL}
                 WHERE user_uuid = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2;"
            ),
            user,
            limit,
        )
    }

    fn count_unread(&self, user: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_uuid = ?1 AND is_read = 0;",
            [user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn mark_all_read(&self, user: UserId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_uuid = ?1 AND is_read = 0;",
            [user.to_string()],
        )?;
        Ok(changed)
    }
}

/// Inserts one notification on `conn`, which may be an open transaction.
pub(crate) fn insert_notification(
    conn: &Connection,
    notification: &Notification,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO notifications (
            uuid,
            user_uuid,
            kind,
            title,
            content,
            url,
            created_at,
            is_read,
            message_uuid,
            announcement_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            notification.uuid.to_string(),
            notification.user.to_string(),
            notification.kind.as_str(),
            notification.title.as_str(),
            notification.content.as_str(),
            notification.url.as_deref(),
            notification.created_at,
            bool_to_int(notification.is_read),
            notification.message.map(|id| id.to_string()),
            notification.announcement.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let uuid_text: String = row.get("uuid")?;
    let user_text: String = row.get("user_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = NotificationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in notifications.kind"))
    })?;

    Ok(Notification {
        uuid: parse_uuid(&uuid_text, "notifications.uuid")?,
        user: parse_uuid(&user_text, "notifications.user_uuid")?,
        kind,
        title: row.get("title")?,
        content: row.get("content")?,
        url: row.get("url")?,
        created_at: row.get("created_at")?,
        is_read: parse_bool(row.get("is_read")?, "notifications.is_read")?,
        message: parse_opt_uuid(row.get("message_uuid")?, "notifications.message_uuid")?,
        announcement: parse_opt_uuid(
            row.get("announcement_uuid")?,
            "notifications.announcement_uuid",
        )?,
    })
}

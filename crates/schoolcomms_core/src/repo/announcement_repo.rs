//! Announcement repository: announcements, their targets and read receipts.
//!
//! # Responsibility
//! - Persist an announcement together with its fan-out rows atomically.
//! - Answer visibility, search and unread queries for one user.
//!
//! # Invariants
//! - Receipts are created unread; `mark_all_read` only touches rows whose
//!   `read_at` is still NULL, so repeating it changes nothing.

use super::notification_repo::insert_notification;
use super::{parse_uuid, Page, Paged, RepoError, RepoResult};
use crate::model::announcement::{Announcement, AnnouncementId, AnnouncementRead};
use crate::model::notification::Notification;
use crate::model::user::{GroupId, UserId};
use crate::model::{now_ms, EpochMillis};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ANNOUNCEMENT_SELECT_SQL: &str = "SELECT
    uuid,
    author_uuid,
    title,
    content,
    created_at
FROM announcements";

const VISIBLE_TO_SQL: &str = "(author_uuid = ?
    OR EXISTS (
        SELECT 1 FROM announcement_reads r
        WHERE r.announcement_uuid = announcements.uuid AND r.user_uuid = ?
    )
    OR EXISTS (
        SELECT 1 FROM announcement_recipients ar
        WHERE ar.announcement_uuid = announcements.uuid AND ar.user_uuid = ?
    ))";

/// Search options for announcement listings.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementQuery {
    /// Restrict to announcements authored by or addressed to this user.
    pub visible_to: Option<UserId>,
    pub author: Option<UserId>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    pub group: Option<GroupId>,
    pub created_from: Option<EpochMillis>,
    /// Exclusive upper bound.
    pub created_before: Option<EpochMillis>,
}

pub trait AnnouncementRepository {
    /// Inserts the announcement, its targets, one unread receipt per
    /// recipient and the prepared notifications in one transaction.
    fn create_announcement(
        &self,
        announcement: &Announcement,
        recipients: &[UserId],
        notifications: &[Notification],
    ) -> RepoResult<AnnouncementId>;
    /// Updates title, content and targets. Existing receipts are kept.
    fn update_announcement(&self, announcement: &Announcement) -> RepoResult<()>;
    fn get_announcement(&self, id: AnnouncementId) -> RepoResult<Option<Announcement>>;
    fn delete_announcement(&self, id: AnnouncementId) -> RepoResult<()>;
    /// Newest first.
    fn search(&self, query: &AnnouncementQuery, page: Page) -> RepoResult<Paged<Announcement>>;
    fn receipt(&self, id: AnnouncementId, user: UserId) -> RepoResult<Option<AnnouncementRead>>;
    fn count_unread(&self, user: UserId) -> RepoResult<u64>;
    /// Returns how many receipts flipped to read.
    fn mark_all_read(&self, user: UserId) -> RepoResult<usize>;
}

/// SQLite-backed announcement repository.
pub struct SqliteAnnouncementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnnouncementRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_targets(&self, announcement: &mut Announcement) -> RepoResult<()> {
        let id = announcement.uuid.to_string();
        announcement.recipients = load_uuid_column(
            self.conn,
            "SELECT user_uuid FROM announcement_recipients
             WHERE announcement_uuid = ?1 ORDER BY user_uuid;",
            &id,
            "announcement_recipients.user_uuid",
        )?;
        announcement.target_groups = load_uuid_column(
            self.conn,
            "SELECT group_uuid FROM announcement_groups
             WHERE announcement_uuid = ?1 ORDER BY group_uuid;",
            &id,
            "announcement_groups.group_uuid",
        )?;
        Ok(())
    }
}

impl AnnouncementRepository for SqliteAnnouncementRepository<'_> {
    fn create_announcement(
        &self,
        announcement: &Announcement,
        recipients: &[UserId],
        notifications: &[Notification],
    ) -> RepoResult<AnnouncementId> {
        announcement.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO announcements (uuid, author_uuid, title, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                announcement.uuid.to_string(),
                announcement.author.to_string(),
                announcement.title.trim(),
                announcement.content.as_str(),
                announcement.created_at,
            ],
        )?;
        write_targets(&tx, announcement)?;

        for user in recipients {
            tx.execute(
                "INSERT OR IGNORE INTO announcement_reads (announcement_uuid, user_uuid, read_at)
                 VALUES (?1, ?2, NULL);",
                params![announcement.uuid.to_string(), user.to_string()],
            )?;
        }
        for notification in notifications {
            insert_notification(&tx, notification)?;
        }

        tx.commit()?;
        Ok(announcement.uuid)
    }

    fn update_announcement(&self, announcement: &Announcement) -> RepoResult<()> {
        announcement.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE announcements SET title = ?2, content = ?3 WHERE uuid = ?1;",
            params![
                announcement.uuid.to_string(),
                announcement.title.trim(),
                announcement.content.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(announcement.uuid));
        }

        let id = announcement.uuid.to_string();
        tx.execute(
            "DELETE FROM announcement_recipients WHERE announcement_uuid = ?1;",
            [id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM announcement_groups WHERE announcement_uuid = ?1;",
            [id.as_str()],
        )?;
        write_targets(&tx, announcement)?;

        tx.commit()?;
        Ok(())
    }

    fn get_announcement(&self, id: AnnouncementId) -> RepoResult<Option<Announcement>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ANNOUNCEMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut announcement = parse_announcement_row(row)?;
            self.load_targets(&mut announcement)?;
            return Ok(Some(announcement));
        }
        Ok(None)
    }

    fn delete_announcement(&self, id: AnnouncementId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM announcements WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn search(&self, query: &AnnouncementQuery, page: Page) -> RepoResult<Paged<Announcement>> {
        let mut filter = String::from(" WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(user) = query.visible_to {
            filter.push_str(" AND ");
            filter.push_str(VISIBLE_TO_SQL);
            for _ in 0..3 {
                bind_values.push(Value::Text(user.to_string()));
            }
        }
        if let Some(author) = query.author {
            filter.push_str(" AND author_uuid = ?");
            bind_values.push(Value::Text(author.to_string()));
        }
        if let Some(text) = query.title_contains.as_deref().map(str::trim) {
            if !text.is_empty() {
                filter.push_str(" AND instr(lower(title), lower(?)) > 0");
                bind_values.push(Value::Text(text.to_string()));
            }
        }
        if let Some(group) = query.group {
            filter.push_str(
                " AND EXISTS (
                    SELECT 1 FROM announcement_groups ag
                    WHERE ag.announcement_uuid = announcements.uuid AND ag.group_uuid = ?
                )",
            );
            bind_values.push(Value::Text(group.to_string()));
        }
        if let Some(from) = query.created_from {
            filter.push_str(" AND created_at >= ?");
            bind_values.push(Value::Integer(from));
        }
        if let Some(before) = query.created_before {
            filter.push_str(" AND created_at < ?");
            bind_values.push(Value::Integer(before));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM announcements{filter};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let mut sql = format!("{ANNOUNCEMENT_SELECT_SQL}{filter} ORDER BY created_at DESC, uuid ASC");
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_announcement_row(row)?);
        }
        for announcement in &mut items {
            self.load_targets(announcement)?;
        }

        Ok(Paged {
            items,
            page: page.number,
            total: total.max(0) as u64,
            page_size: page.size,
        })
    }

    fn receipt(&self, id: AnnouncementId, user: UserId) -> RepoResult<Option<AnnouncementRead>> {
        let mut stmt = self.conn.prepare(
            "SELECT read_at FROM announcement_reads
             WHERE announcement_uuid = ?1 AND user_uuid = ?2;",
        )?;
        let mut rows = stmt.query(params![id.to_string(), user.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(AnnouncementRead {
                announcement: id,
                user,
                read_at: row.get("read_at")?,
            }));
        }
        Ok(None)
    }

    fn count_unread(&self, user: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM announcement_reads WHERE user_uuid = ?1 AND read_at IS NULL;",
            [user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn mark_all_read(&self, user: UserId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE announcement_reads SET read_at = ?2
             WHERE user_uuid = ?1 AND read_at IS NULL;",
            params![user.to_string(), now_ms()],
        )?;
        Ok(changed)
    }
}

fn write_targets(conn: &Connection, announcement: &Announcement) -> RepoResult<()> {
    let id = announcement.uuid.to_string();
    for user in &announcement.recipients {
        conn.execute(
            "INSERT OR IGNORE INTO announcement_recipients (announcement_uuid, user_uuid)
             VALUES (?1, ?2);",
            params![id.as_str(), user.to_string()],
        )?;
    }
    for group in &announcement.target_groups {
        conn.execute(
            "INSERT OR IGNORE INTO announcement_groups (announcement_uuid, group_uuid)
             VALUES (?1, ?2);",
            params![id.as_str(), group.to_string()],
        )?;
    }
    Ok(())
}

fn load_uuid_column(
    conn: &Connection,
    sql: &str,
    key: &str,
    column: &str,
) -> RepoResult<Vec<uuid::Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        values.push(parse_uuid(&text, column)?);
    }
    Ok(values)
}

fn parse_announcement_row(row: &Row<'_>) -> RepoResult<Announcement> {
    let uuid_text: String = row.get("uuid")?;
    let author_text: String = row.get("author_uuid")?;
    Ok(Announcement {
        uuid: parse_uuid(&uuid_text, "announcements.uuid")?,
        author: parse_uuid(&author_text, "announcements.author_uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        recipients: Vec::new(),
        target_groups: Vec::new(),
    })
}

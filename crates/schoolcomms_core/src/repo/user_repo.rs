//! User, preference and class-group repository.
//!
//! # Invariants
//! - Usernames are unique case-insensitively (enforced by the schema).
//! - At most one preference row per user; absence means defaults.

use super::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::user::{ClassGroup, GroupId, NotificationPreference, Role, User, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT uuid, username, email, role, is_staff FROM users";

pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Everyone except `exclude`, ordered by username.
    fn list_contacts(&self, exclude: UserId) -> RepoResult<Vec<User>>;
    fn get_preference(&self, user: UserId) -> RepoResult<Option<NotificationPreference>>;
    fn set_preference(&self, user: UserId, preference: &NotificationPreference) -> RepoResult<()>;
    fn create_group(&self, group: &ClassGroup) -> RepoResult<GroupId>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<ClassGroup>>;
    fn add_member(&self, group: GroupId, user: UserId) -> RepoResult<()>;
    fn add_tutor(&self, group: GroupId, user: UserId) -> RepoResult<()>;
    fn group_members(&self, group: GroupId) -> RepoResult<Vec<User>>;
    fn group_tutors(&self, group: GroupId) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_users(&self, sql: &str, key: &str) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn link_group(&self, table: &str, group: GroupId, user: UserId) -> RepoResult<()> {
        if self.get_group(group)?.is_none() {
            return Err(RepoError::NotFound(group));
        }
        if self.get_user(user)?.is_none() {
            return Err(RepoError::NotFound(user));
        }
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {table} (group_uuid, user_uuid) VALUES (?1, ?2);"),
            params![group.to_string(), user.to_string()],
        )?;
        Ok(())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        self.conn.execute(
            "INSERT INTO users (uuid, username, email, role, is_staff)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.uuid.to_string(),
                user.username.trim(),
                user.email.trim(),
                user.role.map(Role::as_str),
                bool_to_int(user.is_staff),
            ],
        )?;
        Ok(user.uuid)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE uuid = ?1;");
        Ok(self.query_users(&sql, &id.to_string())?.pop())
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE username = ?1 COLLATE NOCASE;");
        Ok(self.query_users(&sql, username.trim())?.pop())
    }

    fn list_contacts(&self, exclude: UserId) -> RepoResult<Vec<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE uuid <> ?1 ORDER BY username COLLATE NOCASE;");
        self.query_users(&sql, &exclude.to_string())
    }

    fn get_preference(&self, user: UserId) -> RepoResult<Option<NotificationPreference>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                email_enabled,
                sms_enabled,
                push_enabled,
                notify_on_announcement,
                notify_on_message,
                daily_digest
             FROM notification_preferences
             WHERE user_uuid = ?1;",
        )?;
        let mut rows = stmt.query([user.to_string()])?;
        if let Some(row) = rows.next()? {
            let flag = |column: &str| -> RepoResult<bool> {
                parse_bool(
                    row.get(column)?,
                    &format!("notification_preferences.{column}"),
                )
            };
            return Ok(Some(NotificationPreference {
                email_enabled: flag("email_enabled")?,
                sms_enabled: flag("sms_enabled")?,
                push_enabled: flag("push_enabled")?,
                notify_on_announcement: flag("notify_on_announcement")?,
                notify_on_message: flag("notify_on_message")?,
                daily_digest: flag("daily_digest")?,
            }));
        }
        Ok(None)
    }

    fn set_preference(&self, user: UserId, preference: &NotificationPreference) -> RepoResult<()> {
        if self.get_user(user)?.is_none() {
            return Err(RepoError::NotFound(user));
        }
        self.conn.execute(
            "INSERT INTO notification_preferences (
                user_uuid,
                email_enabled,
                sms_enabled,
                push_enabled,
                notify_on_announcement,
                notify_on_message,
                daily_digest
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_uuid) DO UPDATE SET
                email_enabled = excluded.email_enabled,
                sms_enabled = excluded.sms_enabled,
                push_enabled = excluded.push_enabled,
                notify_on_announcement = excluded.notify_on_announcement,
                notify_on_message = excluded.notify_on_message,
                daily_digest = excluded.daily_digest;",
            params![
                user.to_string(),
                bool_to_int(preference.email_enabled),
                bool_to_int(preference.sms_enabled),
                bool_to_int(preference.push_enabled),
                bool_to_int(preference.notify_on_announcement),
                bool_to_int(preference.notify_on_message),
                bool_to_int(preference.daily_digest),
            ],
        )?;
        Ok(())
    }

    fn create_group(&self, group: &ClassGroup) -> RepoResult<GroupId> {
        group.validate()?;
        self.conn.execute(
            "INSERT INTO class_groups (uuid, name, stage) VALUES (?1, ?2, ?3);",
            params![group.uuid.to_string(), group.name.trim(), group.stage.trim()],
        )?;
        Ok(group.uuid)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<ClassGroup>> {
        let group = self
            .conn
            .query_row(
                "SELECT uuid, name, stage FROM class_groups WHERE uuid = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("uuid")?,
                        row.get::<_, String>("name")?,
                        row.get::<_, String>("stage")?,
                    ))
                },
            )
            .optional()?;

        group
            .map(|(uuid, name, stage)| {
                Ok(ClassGroup {
                    uuid: parse_uuid(&uuid, "class_groups.uuid")?,
                    name,
                    stage,
                })
            })
            .transpose()
    }

    fn add_member(&self, group: GroupId, user: UserId) -> RepoResult<()> {
        self.link_group("group_members", group, user)
    }

    fn add_tutor(&self, group: GroupId, user: UserId) -> RepoResult<()> {
        self.link_group("group_tutors", group, user)
    }

    fn group_members(&self, group: GroupId) -> RepoResult<Vec<User>> {
        self.query_users(
            "SELECT u.uuid, u.username, u.email, u.role, u.is_staff
             FROM users u
             INNER JOIN group_members gm ON gm.user_uuid = u.uuid
             WHERE gm.group_uuid = ?1
             ORDER BY u.username COLLATE NOCASE;",
            &group.to_string(),
        )
    }

    fn group_tutors(&self, group: GroupId) -> RepoResult<Vec<User>> {
        self.query_users(
            "SELECT u.uuid, u.username, u.email, u.role, u.is_staff
             FROM users u
             INNER JOIN group_tutors gt ON gt.user_uuid = u.uuid
             WHERE gt.group_uuid = ?1
             ORDER BY u.username COLLATE NOCASE;",
            &group.to_string(),
        )
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    let role = match row.get::<_, Option<String>>("role")? {
        Some(value) => Some(Role::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{value}` in users.role"))
        })?),
        None => None,
    };

    Ok(User {
        uuid: parse_uuid(&uuid_text, "users.uuid")?,
        username: row.get("username")?,
        email: row.get("email")?,
        role,
        is_staff: parse_bool(row.get("is_staff")?, "users.is_staff")?,
    })
}

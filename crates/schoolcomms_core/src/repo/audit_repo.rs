//! Append-only audit log repository.

use super::{parse_opt_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::audit::AuditEntry;
use crate::model::user::UserId;
use rusqlite::{params, Connection};

pub trait AuditRepository {
    fn append(&self, entry: &AuditEntry) -> RepoResult<()>;
    /// Entries for `user`, newest first.
    fn list_for_user(&self, user: UserId, limit: u32) -> RepoResult<Vec<AuditEntry>>;
}

/// SQLite-backed audit repository.
pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn append(&self, entry: &AuditEntry) -> RepoResult<()> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| RepoError::InvalidData(format!("audit metadata: {err}")))?;
        self.conn.execute(
            "INSERT INTO audit_log (uuid, user_uuid, action, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                entry.uuid.to_string(),
                entry.user.map(|id| id.to_string()),
                entry.action.as_str(),
                entry.created_at,
                metadata,
            ],
        )?;
        Ok(())
    }

    fn list_for_user(&self, user: UserId, limit: u32) -> RepoResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, user_uuid, action, created_at, metadata
             FROM audit_log
             WHERE user_uuid = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![user.to_string(), i64::from(limit)])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            let metadata = match row.get::<_, Option<String>>("metadata")? {
                Some(text) => Some(serde_json::from_str(&text).map_err(|_| {
                    RepoError::InvalidData(format!("invalid json `{text}` in audit_log.metadata"))
                })?),
                None => None,
            };
            entries.push(AuditEntry {
                uuid: parse_uuid(&uuid_text, "audit_log.uuid")?,
                user: parse_opt_uuid(row.get("user_uuid")?, "audit_log.user_uuid")?,
                action: row.get("action")?,
                created_at: row.get("created_at")?,
                metadata,
            });
        }
        Ok(entries)
    }
}

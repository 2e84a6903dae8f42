//! Delivery attempt log for outgoing mail.

use super::{RepoError, RepoResult};
use crate::model::{now_ms, EpochMillis};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailStatus {
    Sent,
    Failed,
}

impl MailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One delivery attempt for one recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailLogEntry {
    pub uuid: Uuid,
    pub recipient: String,
    pub subject: String,
    pub status: MailStatus,
    /// Entity the mail is about, e.g. `announcement:<uuid>`.
    pub reference: String,
    pub sent_at: EpochMillis,
}

impl MailLogEntry {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        status: MailStatus,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            recipient: recipient.into(),
            subject: subject.into(),
            status,
            reference: reference.into(),
            sent_at: now_ms(),
        }
    }
}

pub trait MailLogRepository {
    fn record(&self, entry: &MailLogEntry) -> RepoResult<()>;
    /// Entries whose reference equals `reference`, oldest first.
    fn list_for_reference(&self, reference: &str) -> RepoResult<Vec<MailLogEntry>>;
}

/// SQLite-backed mail log.
pub struct SqliteMailLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMailLogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MailLogRepository for SqliteMailLogRepository<'_> {
    fn record(&self, entry: &MailLogEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO mail_log (uuid, recipient, subject, status, reference, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                entry.uuid.to_string(),
                entry.recipient.as_str(),
                entry.subject.as_str(),
                entry.status.as_str(),
                entry.reference.as_str(),
                entry.sent_at,
            ],
        )?;
        Ok(())
    }

    fn list_for_reference(&self, reference: &str) -> RepoResult<Vec<MailLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, recipient, subject, status, reference, sent_at
             FROM mail_log
             WHERE reference = ?1
             ORDER BY sent_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([reference])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            let status_text: String = row.get("status")?;
            entries.push(MailLogEntry {
                uuid: super::parse_uuid(&uuid_text, "mail_log.uuid")?,
                recipient: row.get("recipient")?,
                subject: row.get("subject")?,
                status: MailStatus::parse(&status_text).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid status `{status_text}` in mail_log.status"
                    ))
                })?,
                reference: row.get("reference")?,
                sent_at: row.get("sent_at")?,
            });
        }
        Ok(entries)
    }
}

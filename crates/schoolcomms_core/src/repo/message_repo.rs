//! Private message repository contracts and SQLite implementation.

use super::notification_repo::insert_notification;
use super::{bool_to_int, parse_bool, parse_uuid, Page, Paged, RepoError, RepoResult};
use crate::model::message::{MessageId, PrivateMessage};
use crate::model::notification::Notification;
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MESSAGE_SELECT_SQL: &str = "SELECT
    uuid,
    sender_uuid,
    receiver_uuid,
    subject,
    content,
    created_at,
    is_read
FROM private_messages";

pub trait MessageRepository {
    /// Inserts the message and the receiver's notification in one transaction.
    fn create_message(
        &self,
        message: &PrivateMessage,
        notification: &Notification,
    ) -> RepoResult<MessageId>;
    fn get_message(&self, id: MessageId) -> RepoResult<Option<PrivateMessage>>;
    fn set_read(&self, id: MessageId, is_read: bool) -> RepoResult<()>;
    /// Unread messages addressed to `receiver`, newest first.
    fn unread_for(&self, receiver: UserId, limit: Option<u32>) -> RepoResult<Vec<PrivateMessage>>;
    fn count_unread(&self, receiver: UserId) -> RepoResult<u64>;
    fn count_received(&self, receiver: UserId) -> RepoResult<u64>;
    /// Messages sent by `sender`, newest first.
    fn sent_by(&self, sender: UserId, page: Page) -> RepoResult<Paged<PrivateMessage>>;
    /// Messages exchanged between two users in either direction, oldest first.
    fn conversation(&self, a: UserId, b: UserId) -> RepoResult<Vec<PrivateMessage>>;
}

/// SQLite-backed message repository.
pub struct SqliteMessageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMessageRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_messages(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<PrivateMessage>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_message_row(row)?);
        }
        Ok(messages)
    }
}

impl MessageRepository for SqliteMessageRepository<'_> {
    fn create_message(
        &self,
        message: &PrivateMessage,
        notification: &Notification,
    ) -> RepoResult<MessageId> {
        message.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO private_messages (
                uuid,
                sender_uuid,
                receiver_uuid,
                subject,
                content,
                created_at,
                is_read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                message.uuid.to_string(),
                message.sender.to_string(),
                message.receiver.to_string(),
                message.subject.trim(),
                message.content.as_str(),
                message.created_at,
                bool_to_int(message.is_read),
            ],
        )?;
        insert_notification(&tx, notification)?;
        tx.commit()?;

        Ok(message.uuid)
    }

    fn get_message(&self, id: MessageId) -> RepoResult<Option<PrivateMessage>> {
        let sql = format!("{MESSAGE_SELECT_SQL} WHERE uuid = ?;");
        Ok(self
            .query_messages(&sql, vec![Value::Text(id.to_string())])?
            .pop())
    }

    fn set_read(&self, id: MessageId, is_read: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE private_messages SET is_read = ?2 WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(is_read)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn unread_for(&self, receiver: UserId, limit: Option<u32>) -> RepoResult<Vec<PrivateMessage>> {
        let mut sql = format!(
            "{MESSAGE_SELECT_SQL} WHERE receiver_uuid = ? AND is_read = 0
             ORDER BY created_at DESC, rowid DESC"
        );
        let mut bind_values = vec![Value::Text(receiver.to_string())];
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }
        self.query_messages(&sql, bind_values)
    }

    fn count_unread(&self, receiver: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM private_messages WHERE receiver_uuid = ?1 AND is_read = 0;",
            [receiver.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn count_received(&self, receiver: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM private_messages WHERE receiver_uuid = ?1;",
            [receiver.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn sent_by(&self, sender: UserId, page: Page) -> RepoResult<Paged<PrivateMessage>> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM private_messages WHERE sender_uuid = ?1;",
            [sender.to_string()],
            |row| row.get(0),
        )?;
        let mut sql = format!(
            "{MESSAGE_SELECT_SQL} WHERE sender_uuid = ? ORDER BY created_at DESC, rowid DESC"
        );
        let mut bind_values = vec![Value::Text(sender.to_string())];
        page.push_sql(&mut sql, &mut bind_values);

        Ok(Paged {
            items: self.query_messages(&sql, bind_values)?,
            page: page.number,
            total: total.max(0) as u64,
            page_size: page.size,
        })
    }

    fn conversation(&self, a: UserId, b: UserId) -> RepoResult<Vec<PrivateMessage>> {
        let sql = format!(
            "{MESSAGE_SELECT_SQL}
             WHERE (sender_uuid = ?1 AND receiver_uuid = ?2)
                OR (sender_uuid = ?2 AND receiver_uuid = ?1)
             ORDER BY created_at ASC, rowid ASC;"
        );
        self.query_messages(
            &sql,
            vec![Value::Text(a.to_string()), Value::Text(b.to_string())],
        )
    }
}

fn parse_message_row(row: &Row<'_>) -> RepoResult<PrivateMessage> {
    let uuid_text: String = row.get("uuid")?;
    let sender_text: String = row.get("sender_uuid")?;
    let receiver_text: String = row.get("receiver_uuid")?;
    Ok(PrivateMessage {
        uuid: parse_uuid(&uuid_text, "private_messages.uuid")?,
        sender: parse_uuid(&sender_text, "private_messages.sender_uuid")?,
        receiver: parse_uuid(&receiver_text, "private_messages.receiver_uuid")?,
        subject: row.get("subject")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        is_read: parse_bool(row.get("is_read")?, "private_messages.is_read")?,
    })
}

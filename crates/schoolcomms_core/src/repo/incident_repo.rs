//! Incident repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A `resolved` row always carries `resolved_at`; leaving `resolved`
//!   clears it.

use super::{parse_opt_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::incident::{Incident, IncidentCategory, IncidentId, IncidentState};
use crate::model::user::UserId;
use crate::model::EpochMillis;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const INCIDENT_SELECT_SQL: &str = "SELECT
    uuid,
    author_uuid,
    title,
    description,
    category,
    state,
    reported_at,
    resolved_at
FROM incidents";

pub trait IncidentRepository {
    fn create_incident(&self, incident: &Incident) -> RepoResult<IncidentId>;
    fn get_incident(&self, id: IncidentId) -> RepoResult<Option<Incident>>;
    /// Sets `state`; `resolved_at` is stamped with `at` when entering
    /// `resolved` and cleared otherwise.
    fn set_state(&self, id: IncidentId, state: IncidentState, at: EpochMillis) -> RepoResult<()>;
    /// Newest first; `author = None` lists every incident.
    fn list(&self, author: Option<UserId>, limit: Option<u32>) -> RepoResult<Vec<Incident>>;
    fn count_by_author(&self, author: UserId) -> RepoResult<u64>;
}

/// SQLite-backed incident repository.
pub struct SqliteIncidentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIncidentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl IncidentRepository for SqliteIncidentRepository<'_> {
    fn create_incident(&self, incident: &Incident) -> RepoResult<IncidentId> {
        incident.validate()?;
        self.conn.execute(
            "INSERT INTO incidents (
                uuid,
                author_uuid,
                title,
                description,
                category,
                state,
                reported_at,
                resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                incident.uuid.to_string(),
                incident.author.map(|id| id.to_string()),
                incident.title.trim(),
                incident.description.as_str(),
                incident.category.as_str(),
                incident.state.as_str(),
                incident.reported_at,
                incident.resolved_at,
            ],
        )?;
        Ok(incident.uuid)
    }

    fn get_incident(&self, id: IncidentId) -> RepoResult<Option<Incident>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INCIDENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_incident_row(row)?));
        }
        Ok(None)
    }

    fn set_state(&self, id: IncidentId, state: IncidentState, at: EpochMillis) -> RepoResult<()> {
        let resolved_at = (state == IncidentState::Resolved).then_some(at);
        let changed = self.conn.execute(
            "UPDATE incidents
             SET
                state = ?2,
                resolved_at = CASE
                    WHEN ?3 IS NULL THEN NULL
                    ELSE COALESCE(resolved_at, ?3)
                END
             WHERE uuid = ?1;",
            params![id.to_string(), state.as_str(), resolved_at],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list(&self, author: Option<UserId>, limit: Option<u32>) -> RepoResult<Vec<Incident>> {
        let mut sql = format!("{INCIDENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(author) = author {
            sql.push_str(" AND author_uuid = ?");
            bind_values.push(Value::Text(author.to_string()));
        }
        sql.push_str(" ORDER BY reported_at DESC, uuid ASC");
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut incidents = Vec::new();
        while let Some(row) = rows.next()? {
            incidents.push(parse_incident_row(row)?);
        }
        Ok(incidents)
    }

    fn count_by_author(&self, author: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM incidents WHERE author_uuid = ?1;",
            [author.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

fn parse_incident_row(row: &Row<'_>) -> RepoResult<Incident> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category")?;
    let category = IncidentCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in incidents.category"
        ))
    })?;
    let state_text: String = row.get("state")?;
    let state = IncidentState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid state `{state_text}` in incidents.state"))
    })?;

    Ok(Incident {
        uuid: parse_uuid(&uuid_text, "incidents.uuid")?,
        author: parse_opt_uuid(row.get("author_uuid")?, "incidents.author_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category,
        state,
        reported_at: row.get("reported_at")?,
        resolved_at: row.get("resolved_at")?,
    })
}

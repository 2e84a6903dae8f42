//! Task repository contracts and SQLite implementation.

use super::{
    bool_to_int, date_to_db, parse_bool, parse_date, parse_opt_uuid, parse_time, parse_uuid,
    time_to_db, Page, Paged, RepoError, RepoResult,
};
use crate::model::task::{Task, TaskId};
use crate::model::user::UserId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeMap;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    author_uuid,
    title,
    description,
    due_date,
    due_time,
    completed,
    completed_on
FROM tasks";

/// Completion counters for one author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: u64,
    pub completed: u64,
}

pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Tasks of `author` ordered by due date ascending.
    fn list_by_author(&self, author: UserId, page: Page) -> RepoResult<Paged<Task>>;
    /// Most recent tasks of `author` by due date descending.
    fn latest_by_author(&self, author: UserId, limit: u32) -> RepoResult<Vec<Task>>;
    /// Every task of `author`, due date ascending.
    fn all_by_author(&self, author: UserId) -> RepoResult<Vec<Task>>;
    fn counts_by_author(&self, author: UserId) -> RepoResult<TaskCounts>;
    /// Completed-task counts keyed by completion date inside `[from, to]`.
    fn completed_per_day(
        &self,
        author: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<BTreeMap<NaiveDate, u64>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_tasks(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                author_uuid,
                title,
                description,
                due_date,
                due_time,
                completed,
                completed_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.uuid.to_string(),
                task.author.map(|id| id.to_string()),
                task.title.trim(),
                task.description.as_str(),
                date_to_db(task.due_date),
                time_to_db(task.due_time),
                bool_to_int(task.completed),
                task.completed_on.map(date_to_db),
            ],
        )?;
        Ok(task.uuid)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?2,
                description = ?3,
                due_date = ?4,
                due_time = ?5,
                completed = ?6,
                completed_on = ?7
             WHERE uuid = ?1;",
            params![
                task.uuid.to_string(),
                task.title.trim(),
                task.description.as_str(),
                date_to_db(task.due_date),
                time_to_db(task.due_time),
                bool_to_int(task.completed),
                task.completed_on.map(date_to_db),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(task.uuid));
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let sql = format!("{TASK_SELECT_SQL} WHERE uuid = ?;");
        Ok(self
            .query_tasks(&sql, vec![Value::Text(id.to_string())])?
            .pop())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_by_author(&self, author: UserId, page: Page) -> RepoResult<Paged<Task>> {
        let counts = self.counts_by_author(author)?;
        let mut sql = format!(
            "{TASK_SELECT_SQL} WHERE author_uuid = ? ORDER BY due_date ASC, due_time ASC, uuid ASC"
        );
        let mut bind_values = vec![Value::Text(author.to_string())];
        page.push_sql(&mut sql, &mut bind_values);

        Ok(Paged {
            items: self.query_tasks(&sql, bind_values)?,
            page: page.number,
            total: counts.total,
            page_size: page.size,
        })
    }

    fn latest_by_author(&self, author: UserId, limit: u32) -> RepoResult<Vec<Task>> {
        let sql = format!(
            "{TASK_SELECT_SQL} WHERE author_uuid = ?
             ORDER BY due_date DESC, due_time DESC, uuid ASC LIMIT ?;"
        );
        self.query_tasks(
            &sql,
            vec![
                Value::Text(author.to_string()),
                Value::Integer(i64::from(limit)),
            ],
        )
    }

    fn all_by_author(&self, author: UserId) -> RepoResult<Vec<Task>> {
        let sql = format!(
            "{TASK_SELECT_SQL} WHERE author_uuid = ?
             ORDER BY due_date ASC, due_time ASC, uuid ASC;"
        );
        self.query_tasks(&sql, vec![Value::Text(author.to_string())])
    }

    fn counts_by_author(&self, author: UserId) -> RepoResult<TaskCounts> {
        let (total, completed): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks WHERE author_uuid = ?1;",
            [author.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TaskCounts {
            total: total.max(0) as u64,
            completed: completed.max(0) as u64,
        })
    }

    fn completed_per_day(
        &self,
        author: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<BTreeMap<NaiveDate, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_on, COUNT(*) AS done
             FROM tasks
             WHERE author_uuid = ?1
               AND completed = 1
               AND completed_on >= ?2
               AND completed_on <= ?3
             GROUP BY completed_on;",
        )?;
        let mut rows = stmt.query(params![
            author.to_string(),
            date_to_db(from),
            date_to_db(to)
        ])?;
        let mut per_day = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let day_text: String = row.get("completed_on")?;
            let done: i64 = row.get("done")?;
            per_day.insert(
                parse_date(&day_text, "tasks.completed_on")?,
                done.max(0) as u64,
            );
        }
        Ok(per_day)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let due_date_text: String = row.get("due_date")?;
    let due_time_text: String = row.get("due_time")?;
    let completed_on = row
        .get::<_, Option<String>>("completed_on")?
        .map(|text| parse_date(&text, "tasks.completed_on"))
        .transpose()?;

    let task = Task {
        uuid: parse_uuid(&uuid_text, "tasks.uuid")?,
        author: parse_opt_uuid(row.get("author_uuid")?, "tasks.author_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: parse_date(&due_date_text, "tasks.due_date")?,
        due_time: parse_time(&due_time_text, "tasks.due_time")?,
        completed: parse_bool(row.get("completed")?, "tasks.completed")?,
        completed_on,
    };
    task.validate()?;
    Ok(task)
}

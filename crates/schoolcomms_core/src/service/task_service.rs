//! Task use-cases: CRUD, completion and the calendar feed.

use super::{record_audit, Actor, ServiceError, ServiceResult};
use crate::model::task::{default_due_time, Task, TaskId};
use crate::repo::audit_repo::AuditRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::{Page, Paged};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::json;

pub const TASK_PAGE_SIZE: u32 = 20;

/// Form input for a task. A missing `due_time` means 08:00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub due_time: Option<NaiveTime>,
}

/// One task as shown on the calendar view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub id: TaskId,
    pub title: String,
    /// ISO date of the due day.
    pub start: String,
    /// `HH:MM`.
    pub time: String,
    pub description: String,
    pub completed: bool,
}

pub struct TaskService<R: TaskRepository, A: AuditRepository> {
    repo: R,
    audit: A,
}

impl<R: TaskRepository, A: AuditRepository> TaskService<R, A> {
    pub fn new(repo: R, audit: A) -> Self {
        Self { repo, audit }
    }

    pub fn create(&self, actor: Actor, draft: TaskDraft) -> ServiceResult<Task> {
        let mut task = Task::new(actor.user, draft.title, draft.due_date);
        task.description = draft.description;
        task.due_time = draft.due_time.unwrap_or_else(default_due_time);

        self.repo.create_task(&task)?;
        record_audit(&self.audit, actor, "task.create", json!({ "task": task.uuid }));
        Ok(task)
    }

    /// The actor's tasks by due date ascending, 20 per page.
    pub fn list(&self, actor: Actor, page: u32) -> ServiceResult<Paged<Task>> {
        Ok(self
            .repo
            .list_by_author(actor.user, Page::new(page, TASK_PAGE_SIZE))?)
    }

    /// Every task of the actor in calendar-feed shape.
    pub fn calendar_feed(&self, actor: Actor) -> ServiceResult<Vec<CalendarEntry>> {
        let tasks = self.repo.all_by_author(actor.user)?;
        Ok(tasks
            .into_iter()
            .map(|task| CalendarEntry {
                id: task.uuid,
                start: task.due_date.format("%Y-%m-%d").to_string(),
                time: task.due_time.format("%H:%M").to_string(),
                title: task.title,
                description: task.description,
                completed: task.completed,
            })
            .collect())
    }

    pub fn get(&self, actor: Actor, id: TaskId) -> ServiceResult<Task> {
        let task = self.repo.get_task(id)?.ok_or(ServiceError::NotFound(id))?;
        actor.require_manage(task.author, "view this task")?;
        Ok(task)
    }

    pub fn update(&self, actor: Actor, id: TaskId, draft: TaskDraft) -> ServiceResult<Task> {
        let mut task = self.get(actor, id)?;
        task.title = draft.title;
        task.description = draft.description;
        task.due_date = draft.due_date;
        task.due_time = draft.due_time.unwrap_or_else(default_due_time);

        self.repo.update_task(&task)?;
        record_audit(&self.audit, actor, "task.update", json!({ "task": id }));
        Ok(task)
    }

    /// Marks the task done, stamping `today` as completion date.
    pub fn complete(&self, actor: Actor, id: TaskId, today: NaiveDate) -> ServiceResult<Task> {
        let mut task = self.get(actor, id)?;
        task.complete(today);
        self.repo.update_task(&task)?;
        record_audit(&self.audit, actor, "task.complete", json!({ "task": id }));
        Ok(task)
    }

    pub fn reopen(&self, actor: Actor, id: TaskId) -> ServiceResult<Task> {
        let mut task = self.get(actor, id)?;
        task.reopen();
        self.repo.update_task(&task)?;
        record_audit(&self.audit, actor, "task.reopen", json!({ "task": id }));
        Ok(task)
    }

    pub fn delete(&self, actor: Actor, id: TaskId) -> ServiceResult<()> {
        self.get(actor, id)?;
        self.repo.delete_task(id)?;
        record_audit(&self.audit, actor, "task.delete", json!({ "task": id }));
        Ok(())
    }
}

//! User directory, preferences and class groups.

use super::{record_audit, Actor, ServiceError, ServiceResult};
use crate::model::user::{ClassGroup, GroupId, NotificationPreference, Role, User, UserId};
use crate::model::ValidationErrors;
use crate::repo::audit_repo::AuditRepository;
use crate::repo::user_repo::UserRepository;
use log::info;
use serde_json::json;

pub struct UserService<R: UserRepository, A: AuditRepository> {
    repo: R,
    audit: A,
}

impl<R: UserRepository, A: AuditRepository> UserService<R, A> {
    pub fn new(repo: R, audit: A) -> Self {
        Self { repo, audit }
    }

    /// Creates an account; usernames are unique ignoring case.
    pub fn create_user(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Option<Role>,
        is_staff: bool,
    ) -> ServiceResult<User> {
        let mut user = User::new(username, email);
        user.role = role;
        user.is_staff = is_staff;
        user.validate()?;

        if self.repo.find_by_username(&user.username)?.is_some() {
            let mut errors = ValidationErrors::default();
            errors.add("username", "a user with that username already exists");
            return Err(errors.into());
        }

        self.repo.create_user(&user)?;
        info!(
            "event=user_create module=service status=ok staff={}",
            user.is_staff
        );
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<User> {
        self.repo.get_user(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn find_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(self.repo.find_by_username(username)?)
    }

    /// Everyone the actor can write to.
    pub fn contacts(&self, actor: Actor) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_contacts(actor.user)?)
    }

    /// Stored preference; `None` until the user saves one, which also means
    /// no e-mail is sent to them.
    pub fn preference(&self, actor: Actor) -> ServiceResult<Option<NotificationPreference>> {
        Ok(self.repo.get_preference(actor.user)?)
    }

    pub fn set_preference(
        &self,
        actor: Actor,
        preference: NotificationPreference,
    ) -> ServiceResult<()> {
        self.repo.set_preference(actor.user, &preference)?;
        record_audit(
            &self.audit,
            actor,
            "preference.update",
            json!({
                "email_enabled": preference.email_enabled,
                "notify_on_announcement": preference.notify_on_announcement,
                "notify_on_message": preference.notify_on_message,
            }),
        );
        Ok(())
    }

    pub fn create_group(
        &self,
        actor: Actor,
        name: impl Into<String>,
        stage: impl Into<String>,
    ) -> ServiceResult<ClassGroup> {
        actor.require_staff("create class groups")?;
        let group = ClassGroup::new(name, stage);
        self.repo.create_group(&group)?;
        record_audit(&self.audit, actor, "group.create", json!({ "group": group.uuid }));
        Ok(group)
    }

    pub fn add_member(&self, actor: Actor, group: GroupId, user: UserId) -> ServiceResult<()> {
        actor.require_staff("manage class groups")?;
        self.repo.add_member(group, user)?;
        record_audit(
            &self.audit,
            actor,
            "group.add_member",
            json!({ "group": group, "user": user }),
        );
        Ok(())
    }

    pub fn add_tutor(&self, actor: Actor, group: GroupId, user: UserId) -> ServiceResult<()> {
        actor.require_staff("manage class groups")?;
        self.repo.add_tutor(group, user)?;
        record_audit(
            &self.audit,
            actor,
            "group.add_tutor",
            json!({ "group": group, "user": user }),
        );
        Ok(())
    }
}

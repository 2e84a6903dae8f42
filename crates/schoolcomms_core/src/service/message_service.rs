//! Private messaging use-cases.
//!
//! # Invariants
//! - Every sent message creates exactly one unread notification for its
//!   receiver, in the same transaction as the message.
//! - Only the receiver may open, reply to or toggle a message.
//! - A reply is stored only after its original has been marked read.

use super::notifier::Notifier;
use super::{record_audit, Actor, ServiceError, ServiceResult};
use crate::model::message::{MessageId, PrivateMessage};
use crate::model::user::{User, UserId};
use crate::model::ValidationErrors;
use crate::repo::audit_repo::AuditRepository;
use crate::repo::mail_log_repo::MailLogRepository;
use crate::repo::message_repo::MessageRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{Page, Paged};
use log::info;
use serde_json::json;

pub const OUTBOX_PAGE_SIZE: u32 = 20;

pub struct MessageService<'t, R, A, U, L>
where
    R: MessageRepository,
    A: AuditRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    repo: R,
    audit: A,
    notifier: Notifier<'t, U, L>,
}

impl<'t, R, A, U, L> MessageService<'t, R, A, U, L>
where
    R: MessageRepository,
    A: AuditRepository,
    U: UserRepository,
    L: MailLogRepository,
{
    pub fn new(repo: R, audit: A, notifier: Notifier<'t, U, L>) -> Self {
        Self {
            repo,
            audit,
            notifier,
        }
    }

    pub fn send(
        &self,
        actor: Actor,
        receiver: UserId,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> ServiceResult<PrivateMessage> {
        let message = PrivateMessage::new(actor.user, receiver, subject, content);
        let mut errors = match message.validate() {
            Ok(()) => ValidationErrors::default(),
            Err(errors) => errors,
        };
        let receiver_user = self.notifier.users().get_user(receiver)?;
        if receiver_user.is_none() {
            errors.add("receiver", "select a valid recipient");
        }
        errors.into_result()?;

        let sender = self.load_user(actor.user)?;
        let receiver_user = receiver_user.ok_or(ServiceError::NotFound(receiver))?;
        self.deliver(actor, message, &sender, &receiver_user)
    }

    /// Replies to a received message and marks the original read.
    pub fn reply(
        &self,
        actor: Actor,
        original: MessageId,
        content: impl Into<String>,
    ) -> ServiceResult<PrivateMessage> {
        let original = self.detail(actor, original)?;
        let reply = PrivateMessage::new(
            actor.user,
            original.sender,
            original.reply_subject(),
            content,
        );
        reply.validate()?;

        let sender = self.load_user(actor.user)?;
        let receiver = self.load_user(original.sender)?;
        self.repo.set_read(original.uuid, true)?;
        self.deliver(actor, reply, &sender, &receiver)
    }

    /// Unread messages received by the actor, newest first.
    pub fn inbox(&self, actor: Actor) -> ServiceResult<Vec<PrivateMessage>> {
        Ok(self.repo.unread_for(actor.user, None)?)
    }

    pub fn outbox(&self, actor: Actor, page: u32) -> ServiceResult<Paged<PrivateMessage>> {
        Ok(self
            .repo
            .sent_by(actor.user, Page::new(page, OUTBOX_PAGE_SIZE))?)
    }

    /// Both directions between the actor and `other`, oldest first.
    pub fn conversation(&self, actor: Actor, other: UserId) -> ServiceResult<Vec<PrivateMessage>> {
        self.load_user(other)?;
        Ok(self.repo.conversation(actor.user, other)?)
    }

    /// Receiver-only view; anyone else gets `NotFound`.
    pub fn detail(&self, actor: Actor, id: MessageId) -> ServiceResult<PrivateMessage> {
        match self.repo.get_message(id)? {
            Some(message) if message.receiver == actor.user => Ok(message),
            _ => Err(ServiceError::NotFound(id)),
        }
    }

    /// Flips the read flag. Returns the new state.
    pub fn toggle_read(&self, actor: Actor, id: MessageId) -> ServiceResult<bool> {
        let message = self
            .repo
            .get_message(id)?
            .ok_or(ServiceError::NotFound(id))?;
        if message.receiver != actor.user {
            return Err(ServiceError::Forbidden("change this message"));
        }
        let is_read = !message.is_read;
        self.repo.set_read(id, is_read)?;
        Ok(is_read)
    }

    pub fn unread_count(&self, actor: Actor) -> ServiceResult<u64> {
        Ok(self.repo.count_unread(actor.user)?)
    }

    fn deliver(
        &self,
        actor: Actor,
        message: PrivateMessage,
        sender: &User,
        receiver: &User,
    ) -> ServiceResult<PrivateMessage> {
        let notification = self.notifier.message_notification(&message, sender);
        self.repo.create_message(&message, &notification)?;
        record_audit(
            &self.audit,
            actor,
            "message.send",
            json!({ "message": message.uuid, "receiver": message.receiver }),
        );

        let emailed = self.notifier.email_message(&message, sender, receiver);
        info!("event=message_send module=service status=ok emailed={emailed}");
        Ok(message)
    }

    fn load_user(&self, id: UserId) -> ServiceResult<User> {
        self.notifier
            .users()
            .get_user(id)?
            .ok_or(ServiceError::NotFound(id))
    }
}

//! Notification fan-out for announcements and private messages.
//!
//! # Responsibility
//! - Resolve announcement audiences (direct recipients plus group members).
//! - Prepare in-app notifications for the creating service to persist in
//!   its own transaction.
//! - Render and submit e-mail after the triggering write has committed.
//!
//! # Invariants
//! - Mail delivery failures are logged, recorded in the mail log and
//!   swallowed; they never fail the triggering write.
//! - Every delivery attempt produces one mail log row per recipient address.

use crate::mail::templates::{render_html, AnnouncementEmail, MessageEmail};
use crate::mail::{MailTransport, OutgoingMail};
use crate::model::announcement::Announcement;
use crate::model::message::PrivateMessage;
use crate::model::notification::{Notification, NotificationKind};
use crate::model::user::{NotificationPreference, User, UserId};
use crate::repo::mail_log_repo::{MailLogEntry, MailLogRepository, MailStatus};
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use std::collections::HashSet;

pub fn announcement_url(announcement: &Announcement) -> String {
    format!("/dashboard/announcements/{}/", announcement.uuid)
}

pub fn message_url(message: &PrivateMessage) -> String {
    format!("/dashboard/messages/{}/", message.uuid)
}

/// Fan-out helper shared by the announcement and message services.
pub struct Notifier<'t, U: UserRepository, L: MailLogRepository> {
    users: U,
    mail_log: L,
    transport: &'t dyn MailTransport,
    from_address: String,
}

impl<'t, U: UserRepository, L: MailLogRepository> Notifier<'t, U, L> {
    pub fn new(
        users: U,
        mail_log: L,
        transport: &'t dyn MailTransport,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            users,
            mail_log,
            transport,
            from_address: from_address.into(),
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// Direct recipients followed by members of every target group, each
    /// user at most once.
    pub fn announcement_audience(&self, announcement: &Announcement) -> RepoResult<Vec<User>> {
        let mut seen: HashSet<UserId> = HashSet::new();
        let mut audience = Vec::new();

        for id in &announcement.recipients {
            let user = self
                .users
                .get_user(*id)?
                .ok_or(RepoError::NotFound(*id))?;
            if seen.insert(user.uuid) {
                audience.push(user);
            }
        }
        for group in &announcement.target_groups {
            for member in self.users.group_members(*group)? {
                if seen.insert(member.uuid) {
                    audience.push(member);
                }
            }
        }

        Ok(audience)
    }

    pub fn announcement_notifications(
        &self,
        announcement: &Announcement,
        audience: &[User],
    ) -> Vec<Notification> {
        let url = announcement_url(announcement);
        audience
            .iter()
            .map(|user| {
                let mut notification = Notification::new(
                    user.uuid,
                    NotificationKind::Announcement,
                    format!("New announcement: {}", announcement.title),
                    truncate_chars(&announcement.content, 140),
                );
                notification.url = Some(url.clone());
                notification.announcement = Some(announcement.uuid);
                notification
            })
            .collect()
    }

    pub fn message_notification(&self, message: &PrivateMessage, sender: &User) -> Notification {
        let subject = if message.subject.trim().is_empty() {
            "(no subject)"
        } else {
            message.subject.as_str()
        };
        let mut notification = Notification::new(
            message.receiver,
            NotificationKind::Message,
            "New private message",
            format!("{} sent you: {subject}", sender.username),
        );
        notification.url = Some(message_url(message));
        notification.message = Some(message.uuid);
        notification
    }

    /// E-mails every audience member whose preference asks for it.
    /// Returns how many mails were accepted by the transport.
    pub fn email_announcement(
        &self,
        announcement: &Announcement,
        author: &User,
        audience: &[User],
    ) -> usize {
        let url = announcement_url(announcement);
        let reference = format!("announcement:{}", announcement.uuid);
        let subject = format!("New announcement: {}", announcement.title);
        let mut sent = 0;

        for user in audience {
            let wants = self
                .preference_of(user.uuid)
                .is_some_and(|preference| preference.wants_announcement_email());
            if !wants {
                continue;
            }
            let body = render_html(&AnnouncementEmail {
                recipient_name: &user.username,
                author_name: &author.username,
                title: &announcement.title,
                content: &announcement.content,
                url: &url,
            });
            if self.submit(&user.email, &subject, body, &reference) {
                sent += 1;
            }
        }

        sent
    }

    /// E-mails the receiver when their preference asks for it.
    pub fn email_message(&self, message: &PrivateMessage, sender: &User, receiver: &User) -> bool {
        let wants = self
            .preference_of(receiver.uuid)
            .is_some_and(|preference| preference.wants_message_email());
        if !wants {
            return false;
        }
        let url = message_url(message);
        let body = render_html(&MessageEmail {
            recipient_name: &receiver.username,
            sender_name: &sender.username,
            subject: &message.subject,
            content: &message.content,
            url: &url,
        });
        self.submit(
            &receiver.email,
            &format!("New message from {}", sender.username),
            body,
            &format!("message:{}", message.uuid),
        )
    }

    /// Delivers one mail to several addresses and logs one row per address.
    pub fn submit_many(
        &self,
        to: Vec<String>,
        subject: &str,
        body: Result<String, crate::mail::MailError>,
        reference: &str,
    ) -> bool {
        let outcome = body.and_then(|html_body| {
            self.transport.deliver(&OutgoingMail {
                from: self.from_address.clone(),
                to: to.clone(),
                subject: subject.to_string(),
                html_body,
            })
        });

        let status = match &outcome {
            Ok(_) => MailStatus::Sent,
            Err(err) => {
                warn!(
                    "event=mail_deliver module=notifier status=error reference={reference} recipients={} error={err}",
                    to.len()
                );
                MailStatus::Failed
            }
        };
        for recipient in &to {
            let entry = MailLogEntry::new(recipient.as_str(), subject, status, reference);
            if let Err(err) = self.mail_log.record(&entry) {
                warn!(
                    "event=mail_log_record module=notifier status=error reference={reference} error={err}"
                );
            }
        }

        outcome.is_ok()
    }

    fn submit(
        &self,
        to: &str,
        subject: &str,
        body: Result<String, crate::mail::MailError>,
        reference: &str,
    ) -> bool {
        self.submit_many(vec![to.to_string()], subject, body, reference)
    }

    /// Stored preference; users without one receive no e-mail.
    fn preference_of(&self, user: UserId) -> Option<NotificationPreference> {
        match self.users.get_preference(user) {
            Ok(preference) => preference,
            Err(err) => {
                warn!(
                    "event=preference_lookup module=notifier status=error error={err}"
                );
                None
            }
        }
    }
}

mod test_support;

use schoolcomms_core::model::message::{MessageId, PrivateMessage};
use schoolcomms_core::model::notification::{Notification, NotificationKind};
use schoolcomms_core::model::user::{NotificationPreference, UserId};
use schoolcomms_core::repo::audit_repo::SqliteAuditRepository;
use schoolcomms_core::repo::message_repo::{MessageRepository, SqliteMessageRepository};
use schoolcomms_core::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use schoolcomms_core::repo::{Page, Paged};
use schoolcomms_core::service::message_service::MessageService;
use schoolcomms_core::{RepoError, RepoResult, ServiceError};
use test_support::{
    actor, add_user, count_rows, message_service, notifier, open, save_preference,
    RecordingTransport,
};

#[test]
fn send_creates_exactly_one_unread_notification_for_the_receiver() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    let service = message_service(&conn, &transport);

    let message = service
        .send(actor(&teacher), parent.uuid, "Grades", "Please review the report.")
        .unwrap();
    assert!(!message.is_read);

    let notifications = SqliteNotificationRepository::new(&conn)
        .list_unread(parent.uuid, 20)
        .unwrap();
    assert_eq!(notifications.len(), 1);
    let notification = &notifications[0];
    assert_eq!(notification.kind, NotificationKind::Message);
    assert_eq!(notification.message, Some(message.uuid));
    assert_eq!(notification.title, "New private message");
    assert_eq!(notification.content, "teacher sent you: Grades");
    assert_eq!(
        notification.url.as_deref(),
        Some(format!("/dashboard/messages/{}/", message.uuid).as_str())
    );
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM notifications;"), 1);
    assert_eq!(service.unread_count(actor(&parent)).unwrap(), 1);

    // No saved preference means no e-mail.
    assert!(transport.sent.borrow().is_empty());
}

#[test]
fn opted_in_receiver_gets_an_email() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    save_preference(
        &conn,
        &parent,
        NotificationPreference {
            notify_on_message: true,
            ..NotificationPreference::default()
        },
    );

    message_service(&conn, &transport)
        .send(actor(&teacher), parent.uuid, "", "See you tomorrow.")
        .unwrap();

    assert_eq!(transport.recipients(), vec!["parent@school.test".to_string()]);
    assert_eq!(transport.sent.borrow()[0].subject, "New message from teacher");
}

#[test]
fn invalid_messages_are_rejected_without_writes() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let service = message_service(&conn, &transport);

    let err = service
        .send(actor(&teacher), uuid::Uuid::new_v4(), "Hello", "   ")
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => {
            assert!(errors.has("content"));
            assert!(errors.has("receiver"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM private_messages;"), 0);
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM notifications;"), 0);
}

#[test]
fn only_the_receiver_may_read_or_toggle() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    let stranger = add_user(&conn, "stranger", true);
    let service = message_service(&conn, &transport);
    let message = service
        .send(actor(&teacher), parent.uuid, "Trip", "Signed form needed.")
        .unwrap();

    assert!(matches!(
        service.detail(actor(&stranger), message.uuid),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.detail(actor(&teacher), message.uuid),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.toggle_read(actor(&stranger), message.uuid),
        Err(ServiceError::Forbidden(_))
    ));

    assert!(service.toggle_read(actor(&parent), message.uuid).unwrap());
    assert!(service.detail(actor(&parent), message.uuid).unwrap().is_read);
    assert!(!service.toggle_read(actor(&parent), message.uuid).unwrap());
    assert_eq!(service.inbox(actor(&parent)).unwrap().len(), 1);
}

#[test]
fn reply_prefixes_subject_and_marks_original_read() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    let service = message_service(&conn, &transport);
    let original = service
        .send(actor(&teacher), parent.uuid, "Meeting", "Can we meet on Friday?")
        .unwrap();

    let reply = service
        .reply(actor(&parent), original.uuid, "Friday works.")
        .unwrap();
    assert_eq!(reply.subject, "Re: Meeting");
    assert_eq!(reply.receiver, teacher.uuid);
    assert_eq!(reply.sender, parent.uuid);
    assert!(service.detail(actor(&parent), original.uuid).unwrap().is_read);
    assert_eq!(service.unread_count(actor(&teacher)).unwrap(), 1);

    // Only the receiver of the original may reply.
    assert!(matches!(
        service.reply(actor(&teacher), original.uuid, "Me again"),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn outbox_pages_by_twenty_and_conversation_reads_oldest_first() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    let service = message_service(&conn, &transport);

    for index in 0..21 {
        service
            .send(actor(&teacher), parent.uuid, format!("Note {index}"), "Body")
            .unwrap();
    }
    let answer = service
        .send(actor(&parent), teacher.uuid, "Answer", "Thanks")
        .unwrap();

    let first = service.outbox(actor(&teacher), 1).unwrap();
    assert_eq!(first.total, 21);
    assert_eq!(first.items.len(), 20);
    assert_eq!(first.items[0].subject, "Note 20");
    assert_eq!(service.outbox(actor(&teacher), 2).unwrap().items.len(), 1);

    let thread = service.conversation(actor(&teacher), parent.uuid).unwrap();
    assert_eq!(thread.len(), 22);
    assert_eq!(thread[0].subject, "Note 0");
    assert_eq!(thread.last().map(|m| m.uuid), Some(answer.uuid));
}

/// Delegates to SQLite but refuses to change read flags.
struct ReadFlagLocked<'conn>(SqliteMessageRepository<'conn>);

impl MessageRepository for ReadFlagLocked<'_> {
    fn create_message(
        &self,
        message: &PrivateMessage,
        notification: &Notification,
    ) -> RepoResult<MessageId> {
        self.0.create_message(message, notification)
    }

    fn get_message(&self, id: MessageId) -> RepoResult<Option<PrivateMessage>> {
        self.0.get_message(id)
    }

    fn set_read(&self, _id: MessageId, _is_read: bool) -> RepoResult<()> {
        Err(RepoError::InvalidData("read flag is locked".to_string()))
    }

    fn unread_for(&self, receiver: UserId, limit: Option<u32>) -> RepoResult<Vec<PrivateMessage>> {
        self.0.unread_for(receiver, limit)
    }

    fn count_unread(&self, receiver: UserId) -> RepoResult<u64> {
        self.0.count_unread(receiver)
    }

    fn count_received(&self, receiver: UserId) -> RepoResult<u64> {
        self.0.count_received(receiver)
    }

    fn sent_by(&self, sender: UserId, page: Page) -> RepoResult<Paged<PrivateMessage>> {
        self.0.sent_by(sender, page)
    }

    fn conversation(&self, a: UserId, b: UserId) -> RepoResult<Vec<PrivateMessage>> {
        self.0.conversation(a, b)
    }
}

#[test]
fn failed_read_mark_stores_no_reply() {
    let conn = open();
    let transport = RecordingTransport::default();
    let teacher = add_user(&conn, "teacher", false);
    let parent = add_user(&conn, "parent", false);
    let original = message_service(&conn, &transport)
        .send(actor(&teacher), parent.uuid, "Meeting", "Can we meet on Friday?")
        .unwrap();

    let locked = MessageService::new(
        ReadFlagLocked(SqliteMessageRepository::new(&conn)),
        SqliteAuditRepository::new(&conn),
        notifier(&conn, &transport),
    );
    let err = locked
        .reply(actor(&parent), original.uuid, "Friday works.")
        .unwrap_err();

    assert!(matches!(err, ServiceError::Repo(RepoError::InvalidData(_))));
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM private_messages;"), 1);
    assert_eq!(
        SqliteNotificationRepository::new(&conn)
            .count_unread(teacher.uuid)
            .unwrap(),
        0
    );
}

#![allow(dead_code)]

use rusqlite::Connection;
use schoolcomms_core::db::open_db_in_memory;
use schoolcomms_core::mail::{DeliveryStatus, MailError, MailTransport, OutgoingMail};
use schoolcomms_core::model::user::{ClassGroup, NotificationPreference, User};
use schoolcomms_core::repo::announcement_repo::SqliteAnnouncementRepository;
use schoolcomms_core::repo::audit_repo::SqliteAuditRepository;
use schoolcomms_core::repo::mail_log_repo::SqliteMailLogRepository;
use schoolcomms_core::repo::message_repo::SqliteMessageRepository;
use schoolcomms_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use schoolcomms_core::service::announcement_service::AnnouncementService;
use schoolcomms_core::service::message_service::MessageService;
use schoolcomms_core::service::notifier::Notifier;
use schoolcomms_core::Actor;
use std::cell::RefCell;

pub type TestNotifier<'a> = Notifier<'a, SqliteUserRepository<'a>, SqliteMailLogRepository<'a>>;

pub type TestAnnouncementService<'a> = AnnouncementService<
    'a,
    SqliteAnnouncementRepository<'a>,
    SqliteAuditRepository<'a>,
    SqliteUserRepository<'a>,
    SqliteMailLogRepository<'a>,
>;

pub type TestMessageService<'a> = MessageService<
    'a,
    SqliteMessageRepository<'a>,
    SqliteAuditRepository<'a>,
    SqliteUserRepository<'a>,
    SqliteMailLogRepository<'a>,
>;

/// Captures mail instead of sending it; optionally fails every delivery.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: RefCell<Vec<OutgoingMail>>,
    pub fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail: true,
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .sent
            .borrow()
            .iter()
            .flat_map(|mail| mail.to.clone())
            .collect();
        all.sort();
        all
    }
}

impl MailTransport for RecordingTransport {
    fn deliver(&self, mail: &OutgoingMail) -> Result<DeliveryStatus, MailError> {
        if self.fail {
            return Err(MailError::Rejected("relay unavailable".to_string()));
        }
        self.sent.borrow_mut().push(mail.clone());
        Ok(DeliveryStatus::Logged)
    }
}

pub fn open() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn add_user(conn: &Connection, username: &str, is_staff: bool) -> User {
    let mut user = User::new(username, format!("{username}@school.test"));
    user.is_staff = is_staff;
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}

pub fn save_preference(conn: &Connection, user: &User, preference: NotificationPreference) {
    SqliteUserRepository::new(conn)
        .set_preference(user.uuid, &preference)
        .unwrap();
}

pub fn add_group(conn: &Connection, name: &str, members: &[&User], tutors: &[&User]) -> ClassGroup {
    let repo = SqliteUserRepository::new(conn);
    let group = ClassGroup::new(name, "ESO");
    repo.create_group(&group).unwrap();
    for member in members {
        repo.add_member(group.uuid, member.uuid).unwrap();
    }
    for tutor in tutors {
        repo.add_tutor(group.uuid, tutor.uuid).unwrap();
    }
    group
}

pub fn actor(user: &User) -> Actor {
    Actor::from(user)
}

pub fn notifier<'a>(conn: &'a Connection, transport: &'a dyn MailTransport) -> TestNotifier<'a> {
    Notifier::new(
        SqliteUserRepository::new(conn),
        SqliteMailLogRepository::new(conn),
        transport,
        "school@school.test",
    )
}

pub fn announcement_service<'a>(
    conn: &'a Connection,
    transport: &'a dyn MailTransport,
) -> TestAnnouncementService<'a> {
    AnnouncementService::new(
        SqliteAnnouncementRepository::new(conn),
        SqliteAuditRepository::new(conn),
        notifier(conn, transport),
    )
}

pub fn message_service<'a>(
    conn: &'a Connection,
    transport: &'a dyn MailTransport,
) -> TestMessageService<'a> {
    MessageService::new(
        SqliteMessageRepository::new(conn),
        SqliteAuditRepository::new(conn),
        notifier(conn, transport),
    )
}

pub fn count_rows(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

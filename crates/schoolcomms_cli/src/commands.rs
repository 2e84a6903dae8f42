//! Subcommand handlers.

use crate::args::{Cli, Command};
use anyhow::{anyhow, bail, Context as _};
use chrono::Local;
use schoolcomms_core::api::{latest_notifications, mark_notifications_read};
use schoolcomms_core::calendar::attendance::simulate_attendance;
use schoolcomms_core::db::{open_db, Connection};
use schoolcomms_core::model::user::{GroupId, User};
use schoolcomms_core::repo::announcement_repo::SqliteAnnouncementRepository;
use schoolcomms_core::repo::audit_repo::SqliteAuditRepository;
use schoolcomms_core::repo::incident_repo::SqliteIncidentRepository;
use schoolcomms_core::repo::mail_log_repo::SqliteMailLogRepository;
use schoolcomms_core::repo::message_repo::SqliteMessageRepository;
use schoolcomms_core::repo::user_repo::SqliteUserRepository;
use schoolcomms_core::service::announcement_service::{AnnouncementDraft, AnnouncementService};
use schoolcomms_core::service::dashboard_service::DashboardService;
use schoolcomms_core::service::incident_service::IncidentService;
use schoolcomms_core::service::message_service::MessageService;
use schoolcomms_core::service::notifier::Notifier;
use schoolcomms_core::service::summary_service::SummaryService;
use schoolcomms_core::service::user_service::UserService;
use schoolcomms_core::{
    Actor, AppConfig, FileOutboxTransport, LogTransport, MailTransport, SchoolCalendar,
};

struct Context {
    config: AppConfig,
    conn: Connection,
    calendar: SchoolCalendar,
    transport: Box<dyn MailTransport>,
}

impl Context {
    fn users(&self) -> UserService<SqliteUserRepository<'_>, SqliteAuditRepository<'_>> {
        UserService::new(
            SqliteUserRepository::new(&self.conn),
            SqliteAuditRepository::new(&self.conn),
        )
    }

    fn notifier(&self) -> Notifier<'_, SqliteUserRepository<'_>, SqliteMailLogRepository<'_>> {
        Notifier::new(
            SqliteUserRepository::new(&self.conn),
            SqliteMailLogRepository::new(&self.conn),
            self.transport.as_ref(),
            self.config.mail.from_address.clone(),
        )
    }

    fn user(&self, username: &str) -> anyhow::Result<User> {
        self.users()
            .find_by_username(username)?
            .ok_or_else(|| anyhow!("unknown user `{username}`"))
    }

    fn actor(&self, username: &str) -> anyhow::Result<Actor> {
        Ok(Actor::from(&self.user(username)?))
    }
}

pub fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let conn = open_db(&config.database.path)
        .with_context(|| format!("opening {}", config.database.path.display()))?;
    let calendar = config.school_calendar()?;
    let transport: Box<dyn MailTransport> = if cli.mail_log_only {
        Box::new(LogTransport)
    } else {
        Box::new(FileOutboxTransport::new(config.mail.outbox_dir.clone()))
    };
    let ctx = Context {
        config,
        conn,
        calendar,
        transport,
    };
    let today = Local::now().date_naive();

    match cli.command {
        Command::Init => {
            println!("database ready at {}", ctx.config.database.path.display());
        }
        Command::AddUser {
            username,
            email,
            role,
            staff,
        } => {
            let user = ctx
                .users()
                .create_user(username, email, role.map(Into::into), staff)?;
            println!("{}", user.uuid);
        }
        Command::AddGroup { name, stage, actor } => {
            let group = ctx.users().create_group(ctx.actor(&actor)?, name, stage)?;
            println!("{}", group.uuid);
        }
        Command::Enroll {
            group,
            username,
            tutor,
            actor,
        } => {
            let actor = ctx.actor(&actor)?;
            let group = parse_group(&group)?;
            let user = ctx.user(&username)?;
            if tutor {
                ctx.users().add_tutor(actor, group, user.uuid)?;
            } else {
                ctx.users().add_member(actor, group, user.uuid)?;
            }
        }
        Command::Announce {
            actor,
            title,
            content,
            recipients,
            groups,
        } => {
            let actor = ctx.actor(&actor)?;
            let recipients = recipients
                .iter()
                .map(|username| ctx.user(username).map(|user| user.uuid))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let target_groups = groups
                .iter()
                .map(|id| parse_group(id))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let service = AnnouncementService::new(
                SqliteAnnouncementRepository::new(&ctx.conn),
                SqliteAuditRepository::new(&ctx.conn),
                ctx.notifier(),
            );
            let announcement = service.create(
                actor,
                AnnouncementDraft {
                    title,
                    content,
                    recipients,
                    target_groups,
                },
            )?;
            println!("{}", announcement.uuid);
        }
        Command::SendMessage {
            actor,
            receiver,
            subject,
            content,
        } => {
            let actor = ctx.actor(&actor)?;
            let receiver = ctx.user(&receiver)?;
            let service = MessageService::new(
                SqliteMessageRepository::new(&ctx.conn),
                SqliteAuditRepository::new(&ctx.conn),
                ctx.notifier(),
            );
            let message = service.send(actor, receiver.uuid, subject, content)?;
            println!("{}", message.uuid);
        }
        Command::ReportIncident {
            actor,
            title,
            description,
            category,
        } => {
            let service = IncidentService::new(
                SqliteIncidentRepository::new(&ctx.conn),
                SqliteAuditRepository::new(&ctx.conn),
            );
            let incident =
                service.report(ctx.actor(&actor)?, title, description, category.into())?;
            println!("{}", incident.uuid);
        }
        Command::Classify { date } => {
            let classification = ctx.calendar.classify(date);
            println!("{date}: {}", classification.reason.label());
        }
        Command::Attendance { until } => {
            let report = simulate_attendance(&ctx.calendar, until.unwrap_or(today));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Dashboard { user, date } => {
            let user = ctx.user(&user)?;
            let view = DashboardService::new(&ctx.conn, &ctx.calendar)
                .build(user.uuid, date.unwrap_or(today))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::DailySummary { date } => {
            let service =
                SummaryService::new(SqliteAnnouncementRepository::new(&ctx.conn), ctx.notifier());
            let report = service.send_daily_summary(date.unwrap_or(today))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.groups_failed > 0 {
                bail!("{} group digest(s) could not be delivered", report.groups_failed);
            }
        }
        Command::Notifications { user } => {
            let user = ctx.user(&user)?;
            let feed = latest_notifications(&ctx.conn, user.uuid)?;
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }
        Command::MarkNotificationsRead { user } => {
            let user = ctx.user(&user)?;
            println!("{}", mark_notifications_read(&ctx.conn, user.uuid)?);
        }
    }

    Ok(())
}

fn parse_group(value: &str) -> anyhow::Result<GroupId> {
    GroupId::parse_str(value).with_context(|| format!("`{value}` is not a group id"))
}

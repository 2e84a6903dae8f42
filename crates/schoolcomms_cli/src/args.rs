//! Command-line arguments.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use schoolcomms_core::model::incident::IncidentCategory;
use schoolcomms_core::model::user::Role;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "schoolcomms",
    about = "School communication platform core",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Configuration file; defaults to `<config dir>/schoolcomms/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log outgoing mail instead of spooling it to the outbox directory.
    #[arg(long, global = true)]
    pub mail_log_only: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Parent,
    Student,
    Teacher,
    Director,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Parent => Role::Parent,
            RoleArg::Student => Role::Student,
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Director => Role::Director,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Technical,
    Disciplinary,
    Other,
}

impl From<CategoryArg> for IncidentCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Technical => IncidentCategory::Technical,
            CategoryArg::Disciplinary => IncidentCategory::Disciplinary,
            CategoryArg::Other => IncidentCategory::Other,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create (or migrate) the database and print its location.
    Init,
    /// Register a user account.
    AddUser {
        username: String,
        email: String,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        #[arg(long)]
        staff: bool,
    },
    /// Create a class group (staff only).
    AddGroup {
        name: String,
        #[arg(long, default_value = "")]
        stage: String,
        /// Acting staff username.
        #[arg(long = "as", value_name = "USERNAME")]
        actor: String,
    },
    /// Add a user to a class group as member or tutor (staff only).
    Enroll {
        group: String,
        username: String,
        #[arg(long)]
        tutor: bool,
        #[arg(long = "as", value_name = "USERNAME")]
        actor: String,
    },
    /// Publish an announcement and notify its audience.
    Announce {
        #[arg(long = "as", value_name = "USERNAME")]
        actor: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Direct recipient usernames.
        #[arg(long = "to", value_name = "USERNAME")]
        recipients: Vec<String>,
        /// Target class group ids.
        #[arg(long = "group", value_name = "GROUP_ID")]
        groups: Vec<String>,
    },
    /// Send a private message.
    SendMessage {
        #[arg(long = "as", value_name = "USERNAME")]
        actor: String,
        #[arg(long = "to", value_name = "USERNAME")]
        receiver: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        content: String,
    },
    /// File an incident report.
    ReportIncident {
        #[arg(long = "as", value_name = "USERNAME")]
        actor: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_enum, default_value = "other")]
        category: CategoryArg,
    },
    /// Classify a date against the school calendar.
    Classify { date: NaiveDate },
    /// Print the simulated attendance series.
    Attendance {
        #[arg(long)]
        until: Option<NaiveDate>,
    },
    /// Print a user's dashboard as JSON.
    Dashboard {
        #[arg(long)]
        user: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mail today's announcement digest to every group's tutors.
    DailySummary {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the notification feed of a user as JSON.
    Notifications {
        #[arg(long)]
        user: String,
    },
    /// Mark every notification of a user read.
    MarkNotificationsRead {
        #[arg(long)]
        user: String,
    },
}

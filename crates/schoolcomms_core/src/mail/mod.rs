//! Outgoing mail: message shape, transport seam and rendering.
//!
//! # Responsibility
//! - Define the `MailTransport` contract the notifier submits mail to.
//! - Ship a spool-directory transport for an external relay and a log-only
//!   transport for development.
//!
//! # Invariants
//! - Transports never retry; the caller records every attempt in the mail log.

mod outbox;
pub mod templates;

pub use outbox::{FileOutboxTransport, LogTransport};

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// A rendered e-mail ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Written to the spool directory at this path.
    Queued(PathBuf),
    /// Only written to the log.
    Logged,
}

#[derive(Debug)]
pub enum MailError {
    NoRecipients,
    Render(askama::Error),
    Serialize(serde_json::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Transport-specific refusal.
    Rejected(String),
}

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRecipients => write!(f, "mail has no recipients"),
            Self::Render(err) => write!(f, "mail template failed to render: {err}"),
            Self::Serialize(err) => write!(f, "mail could not be serialized: {err}"),
            Self::Io { path, source } => {
                write!(f, "mail spool `{}` is not writable: {source}", path.display())
            }
            Self::Rejected(reason) => write!(f, "mail rejected: {reason}"),
        }
    }
}

impl Error for MailError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::NoRecipients | Self::Rejected(_) => None,
        }
    }
}

impl From<askama::Error> for MailError {
    fn from(value: askama::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for MailError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Delivery seam between notification fan-out and the outside world.
pub trait MailTransport {
    fn deliver(&self, mail: &OutgoingMail) -> Result<DeliveryStatus, MailError>;
}

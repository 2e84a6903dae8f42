//! Spool-directory and log-only transports.

use super::{DeliveryStatus, MailError, MailTransport, OutgoingMail};
use crate::model::now_ms;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes each mail as one JSON file into a spool directory.
///
/// Files are named `<epoch-ms>-<uuid>.json` so a relay can process them in
/// submission order.
#[derive(Debug, Clone)]
pub struct FileOutboxTransport {
    dir: PathBuf,
}

#[derive(Serialize)]
struct SpooledMail<'a> {
    id: String,
    queued_at: i64,
    #[serde(flatten)]
    mail: &'a OutgoingMail,
}

impl FileOutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MailTransport for FileOutboxTransport {
    fn deliver(&self, mail: &OutgoingMail) -> Result<DeliveryStatus, MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        fs::create_dir_all(&self.dir).map_err(|source| MailError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let id = Uuid::new_v4().to_string();
        let queued_at = now_ms();
        let path = self.dir.join(format!("{queued_at}-{id}.json"));
        let body = serde_json::to_vec_pretty(&SpooledMail {
            id,
            queued_at,
            mail,
        })?;
        fs::write(&path, body).map_err(|source| MailError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            "event=mail_deliver module=mail status=ok transport=outbox recipients={}",
            mail.to.len()
        );
        Ok(DeliveryStatus::Queued(path))
    }
}

/// Logs delivery metadata and drops the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    fn deliver(&self, mail: &OutgoingMail) -> Result<DeliveryStatus, MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        info!(
            "event=mail_deliver module=mail status=ok transport=log recipients={} subject_chars={}",
            mail.to.len(),
            mail.subject.chars().count()
        );
        Ok(DeliveryStatus::Logged)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileOutboxTransport, LogTransport};
    use crate::mail::{DeliveryStatus, MailError, MailTransport, OutgoingMail};

    fn sample_mail(to: Vec<String>) -> OutgoingMail {
        OutgoingMail {
            from: "noreply@school.test".to_string(),
            to,
            subject: "New announcement: trip".to_string(),
            html_body: "<p>hello</p>".to_string(),
        }
    }

    #[test]
    fn outbox_writes_one_json_file_per_mail() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileOutboxTransport::new(dir.path().join("spool"));

        let status = transport
            .deliver(&sample_mail(vec!["ana@school.test".to_string()]))
            .unwrap();

        let DeliveryStatus::Queued(path) = status else {
            panic!("expected queued delivery");
        };
        let stored: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(stored["subject"], "New announcement: trip");
        assert_eq!(stored["to"][0], "ana@school.test");
        assert_eq!(std::fs::read_dir(transport.dir()).unwrap().count(), 1);
    }

    #[test]
    fn transports_reject_mail_without_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = FileOutboxTransport::new(dir.path());
        assert!(matches!(
            outbox.deliver(&sample_mail(Vec::new())),
            Err(MailError::NoRecipients)
        ));
        assert!(matches!(
            LogTransport.deliver(&sample_mail(Vec::new())),
            Err(MailError::NoRecipients)
        ));
    }
}

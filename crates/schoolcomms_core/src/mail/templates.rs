//! HTML bodies for outgoing mail, compiled from `templates/mail/`.

use super::MailError;
use askama::Template;

#[derive(Template)]
#[template(path = "mail/announcement.html")]
pub struct AnnouncementEmail<'a> {
    pub recipient_name: &'a str,
    pub author_name: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub url: &'a str,
}

#[derive(Template)]
#[template(path = "mail/message.html")]
pub struct MessageEmail<'a> {
    pub recipient_name: &'a str,
    pub sender_name: &'a str,
    pub subject: &'a str,
    pub content: &'a str,
    pub url: &'a str,
}

pub struct SummaryItem {
    pub title: String,
    pub content: String,
}

#[derive(Template)]
#[template(path = "mail/daily_summary.html")]
pub struct DailySummaryEmail<'a> {
    pub group_name: &'a str,
    pub date: String,
    pub items: Vec<SummaryItem>,
}

/// Renders any mail template into an HTML string.
pub fn render_html<T: Template>(template: &T) -> Result<String, MailError> {
    Ok(template.render()?)
}

//! End-of-run notification.

use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::notify::{Notifier, OutgoingEmail};
use crate::types::summary::{JobStatus, JobSummary};

/// Sends the job summary once per invocation.
///
/// Reporting never fails the caller: a missing sender or recipient list skips
/// delivery, and delivery errors are logged and dropped.
pub struct RunReporter {
    notifier: Notifier,
    sender: Option<String>,
    recipients: Vec<String>,
}

impl RunReporter {
    pub fn new(notifier: Notifier, sender: Option<String>, recipients: Vec<String>) -> Self {
        Self {
            notifier,
            sender,
            recipients,
        }
    }

    pub fn from_config(notifier: Notifier, config: &Config) -> Self {
        Self::new(
            notifier,
            config.sender_email.clone(),
            config.recipient_emails.clone(),
        )
    }

    /// Uses whatever addresses were readable from the rejected configuration.
    pub fn from_config_error(notifier: Notifier, error: &ConfigError) -> Self {
        Self::new(
            notifier,
            error.sender_email.clone(),
            error.recipient_emails.clone(),
        )
    }

    pub async fn report(&self, summary: &JobSummary) {
        log_summary(summary);

        let Some(sender) = self.sender.as_ref() else {
            warn!("SENDER_EMAIL is not configured. skipping summary notification.");
            return;
        };
        if self.recipients.is_empty() {
            warn!("RECIPIENT_EMAILS is not configured. skipping summary notification.");
            return;
        }

        let email = render_email(summary, sender, &self.recipients);
        match self.notifier.send(&email).await {
            Ok(()) => info!(
                recipients = self.recipients.len(),
                "summary notification sent."
            ),
            Err(e) => warn!(
                error = format!("{e:#}"),
                "failed to send summary notification."
            ),
        }
    }
}

fn log_summary(summary: &JobSummary) {
    info!(
        status = summary.status.to_string(),
        processed_count = summary.total_processed,
        success_count = summary.success_count,
        error_count = summary.error_count,
        no_credential = summary.failures.no_credential,
        unresolvable_key = summary.failures.unresolvable_key,
        update_failed = summary.failures.update_failed,
        join_failed = summary.failures.join_failed,
        fetch_throttled = summary.failures.fetch_throttled,
        duration = summary.duration_string(),
        error = summary.error.as_deref(),
        "presigned URL refresh finished."
    );
}

pub(crate) fn render_subject(summary: &JobSummary) -> String {
    match summary.status {
        JobStatus::Success => format!(
            "Presigned URL refresh succeeded: {}/{} records updated",
            summary.success_count, summary.total_processed
        ),
        JobStatus::Failed => "Presigned URL refresh FAILED".to_string(),
    }
}

/// Label/value rows shared by the text and HTML bodies.
fn summary_rows(summary: &JobSummary) -> Vec<(&'static str, String)> {
    let unknown = || "-".to_string();
    let mut rows = vec![
        ("Status", summary.status.to_string()),
        ("Start time", summary.start_time.to_rfc3339()),
        ("Duration", summary.duration_string()),
        (
            "Table",
            summary.table_name.clone().unwrap_or_else(unknown),
        ),
        (
            "Bucket",
            summary.bucket_name.clone().unwrap_or_else(unknown),
        ),
        (
            "URL expiration",
            summary
                .expiration_days
                .map(|days| format!("{days} days"))
                .unwrap_or_else(unknown),
        ),
        ("Processed", summary.total_processed.to_string()),
        ("Succeeded", summary.success_count.to_string()),
        ("Failed", summary.error_count.to_string()),
    ];

    let failures = &summary.failures;
    if failures.total() > 0 {
        rows.extend([
            ("No URL generated", failures.no_credential.to_string()),
            ("Unresolvable key", failures.unresolvable_key.to_string()),
            ("Update failed", failures.update_failed.to_string()),
            ("Batch join failed", failures.join_failed.to_string()),
            ("Throttled fetches", failures.fetch_throttled.to_string()),
        ]);
    }

    if let Some(error) = summary.error.as_ref() {
        rows.push(("Error", error.clone()));
    }
    rows
}

pub(crate) fn render_text_body(summary: &JobSummary) -> String {
    let mut body = String::from("Presigned URL refresh summary\n\n");
    for (label, value) in summary_rows(summary) {
        body.push_str(&format!("{label}: {value}\n"));
    }
    body
}

pub(crate) fn render_html_body(summary: &JobSummary) -> String {
    let mut body = String::from("<h2>Presigned URL refresh summary</h2>\n<table>\n");
    for (label, value) in summary_rows(summary) {
        body.push_str(&format!(
            "<tr><th align=\"left\">{label}</th><td>{}</td></tr>\n",
            escape_html(&value)
        ));
    }
    body.push_str("</table>\n");
    body
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn render_email(summary: &JobSummary, sender: &str, recipients: &[String]) -> OutgoingEmail {
    OutgoingEmail {
        from: sender.to_string(),
        to: recipients.to_vec(),
        subject: render_subject(summary),
        html_body: render_html_body(summary),
        text_body: render_text_body(summary),
    }
}

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_sesv2::Client;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use crate::notify::{Notifier, NotifierTrait, OutgoingEmail};
use crate::storage::extract_sdk_error_details;
use crate::types::error::RefreshError;

const CHARSET: &str = "UTF-8";

/// Notifier that sends the run summary through SES v2 `SendEmail`.
#[derive(Clone)]
pub struct SesNotifier {
    client: Client,
}

impl SesNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn boxed(client: Client) -> Notifier {
        Box::new(Self::new(client))
    }
}

fn utf8_content(data: &str) -> Result<Content> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| anyhow!(RefreshError::Notification(e.to_string())))
}

fn build_email_content(email: &OutgoingEmail) -> Result<EmailContent> {
    let body = Body::builder()
        .html(utf8_content(&email.html_body)?)
        .text(utf8_content(&email.text_body)?)
        .build();
    let message = Message::builder()
        .subject(utf8_content(&email.subject)?)
        .body(body)
        .build();

    Ok(EmailContent::builder().simple(message).build())
}

#[async_trait]
impl NotifierTrait for SesNotifier {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let destination = Destination::builder()
            .set_to_addresses(Some(email.to.clone()))
            .build();

        self.client
            .send_email()
            .from_email_address(&email.from)
            .destination(destination)
            .content(build_email_content(email)?)
            .send()
            .await
            .map_err(|e| {
                let (error_code, error_message) = extract_sdk_error_details(&e);
                anyhow!(RefreshError::Notification(format!(
                    "{error_code}: {error_message}"
                )))
            })?;

        Ok(())
    }
}

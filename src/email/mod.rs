//! Outbound email
//!
//! The session service treats mail as fire-and-forget: it logs failures and
//! never lets them abort a flow. `ApiMailer` talks to a transactional-mail
//! HTTP API; `DisabledMailer` stands in when no credentials are configured.

pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

/// Mailer errors
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Mail request failed: {0}")]
    Request(String),

    #[error("Mail API rejected the message (status={status}): {body}")]
    Api { status: u16, body: String },
}

/// Fire-and-forget email delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailerError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody {
    sender: MailAddress,
    to: Vec<MailAddress>,
    subject: String,
    html_content: String,
}

/// Mailer backed by a transactional-mail HTTP API
pub struct ApiMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl ApiMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        sender_email: String,
        sender_name: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            sender_email,
            sender_name,
        }
    }
}

#[async_trait]
impl Notifier for ApiMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailerError> {
        let body = SendMailBody {
            sender: MailAddress {
                email: self.sender_email.clone(),
                name: Some(self.sender_name.clone()),
            },
            to: vec![MailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject: subject.to_string(),
            html_content: html.to_string(),
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MailerError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %to, subject = %subject, "Email sent");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailerError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Mailer used when no credentials are configured; logs and succeeds
pub struct DisabledMailer;

#[async_trait]
impl Notifier for DisabledMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailerError> {
        tracing::debug!(to = %to, subject = %subject, "Email disabled, skipping send");
        Ok(())
    }
}

/// Build a mailer from configuration
pub fn from_config(config: &Config) -> Arc<dyn Notifier> {
    match (&config.mail_api_key, &config.mail_sender_email) {
        (Some(key), Some(sender)) => Arc::new(ApiMailer::new(
            config.mail_api_url.clone(),
            key.clone(),
            sender.clone(),
            config.mail_sender_name.clone(),
        )),
        _ => {
            tracing::warn!("Mail credentials not configured, email delivery disabled");
            Arc::new(DisabledMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_mailer_always_succeeds() {
        let mailer = DisabledMailer;
        assert!(mailer.send("a@x.com", "Hello", "<p>Hi</p>").await.is_ok());
    }

    #[test]
    fn test_send_body_serializes_camel_case() {
        let body = SendMailBody {
            sender: MailAddress {
                email: "noreply@chirp.example".to_string(),
                name: Some("Chirp".to_string()),
            },
            to: vec![MailAddress {
                email: "a@x.com".to_string(),
                name: None,
            }],
            subject: "Hello".to_string(),
            html_content: "<p>Hi</p>".to_string(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["htmlContent"], "<p>Hi</p>");
        assert!(json["to"][0].get("name").is_none());
    }
}

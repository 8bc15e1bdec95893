//! Email delivery backends.

use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use serde::Serialize;

use crate::config::{EMAIL_TIMEOUT_SECS, RESEND_API_URL};

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Delivers email.
///
/// Returns whether the provider accepted the message. Implementations never
/// return an error or panic past this boundary; failures are logged and
/// reported as `false`.
pub trait EmailSender: Send + Sync {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool>;
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

/// Sends through the Resend HTTP API.
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendEmailSender {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_API_URL.to_string(),
        }
    }

    /// Overrides the API endpoint (used against mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl EmailSender for ResendEmailSender {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let payload = ResendPayload {
                from: &self.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.html,
            };
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .timeout(Duration::from_secs(EMAIL_TIMEOUT_SECS))
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Email \"{}\" accepted by Resend", message.subject);
                    true
                }
                Ok(resp) => {
                    warn!(
                        "Resend rejected email \"{}\": HTTP {}",
                        message.subject,
                        resp.status()
                    );
                    false
                }
                Err(e) => {
                    warn!("Email send error: {e}");
                    false
                }
            }
        })
    }
}

/// Used when no email provider is configured; logs and drops every message.
pub struct NoopEmailSender;

impl EmailSender for NoopEmailSender {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            debug!(
                "Email delivery disabled, dropping \"{}\" to {}",
                message.subject,
                message.to.join(", ")
            );
            false
        })
    }
}

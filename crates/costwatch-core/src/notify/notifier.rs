//! Notification delivery for billing summaries

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::config::WebhookConfig;

/// Result of sending a notification
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    /// `webhook` or `stdout`
    pub channel_type: String,
    /// Whether the message was delivered
    pub success: bool,
    /// HTTP status, when the endpoint answered
    pub status: Option<u16>,
    /// Failure description
    pub error: Option<String>,
    /// When delivery was attempted
    pub sent_at: DateTime<Utc>,
}

impl NotificationResult {
    fn from_outcome(
        channel_type: &str,
        sent_at: DateTime<Utc>,
        outcome: Result<Option<u16>, NotificationError>,
    ) -> Self {
        match outcome {
            Ok(status) => Self {
                channel_type: channel_type.to_string(),
                success: true,
                status,
                error: None,
                sent_at,
            },
            Err(e) => Self {
                channel_type: channel_type.to_string(),
                success: false,
                status: e.status(),
                error: Some(e.to_string()),
                sent_at,
            },
        }
    }
}

/// Something that can deliver a formatted message
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`, logging and containing any failure
    async fn send(&self, message: &str) -> NotificationResult;
}

/// Posts messages to a LINE Notify style webhook.
///
/// The request carries `Authorization: Bearer <token>` and the message as the
/// single `message` query parameter.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: String,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(config: &WebhookConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| NotificationError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }

    async fn post(&self, message: &str) -> Result<Option<u16>, NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .query(&[("message", message)])
            .send()
            .await
            .map_err(|e| NotificationError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(status.as_u16()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> NotificationResult {
        let sent_at = Utc::now();
        let outcome = self.post(message).await;

        match &outcome {
            Ok(status) => info!(url = %self.url, status = ?status, "Billing summary delivered"),
            Err(e) => error!(url = %self.url, error = %e, "Request failed"),
        }

        NotificationResult::from_outcome("webhook", sent_at, outcome)
    }
}

/// Writes messages to stdout instead of delivering them
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, message: &str) -> NotificationResult {
        let sent_at = Utc::now();
        let mut stdout = std::io::stdout();
        let outcome = writeln!(stdout, "{message}")
            .map(|()| None)
            .map_err(|e| NotificationError::Io(e.to_string()));

        if let Err(e) = &outcome {
            error!(error = %e, "Failed to write billing summary");
        }

        NotificationResult::from_outcome("stdout", sent_at, outcome)
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Transport failure: connect, timeout, TLS or body
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The endpoint answered with a non-success status
    #[error("Webhook returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if readable
        body: String,
    },

    /// HTTP client could not be built
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Writing the message failed
    #[error("IO error: {0}")]
    Io(String),
}

impl NotificationError {
    /// HTTP status, when the endpoint answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

//! Push delivery through the third-party notification service.
//!
//! In-app notifications live in the `notifications` table; every row addressed
//! to a user id is also handed to a `NotificationProvider` for push delivery.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::database::models::NotificationKind;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid provider endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected delivery with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A push message fanned out to one or more users
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub recipients: Vec<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<Uuid>,
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &PushMessage) -> Result<(), NotifyError>;
}

/// Posts messages as JSON to the configured provider endpoint
pub struct HttpNotificationProvider {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<String>,
}

impl HttpNotificationProvider {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| NotifyError::InvalidEndpoint(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                endpoint.scheme()
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl NotificationProvider for HttpNotificationProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, message: &PushMessage) -> Result<(), NotifyError> {
        let mut request = self.client.post(self.endpoint.clone()).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Used when no provider is configured; deliveries are only logged
pub struct LogNotificationProvider;

#[async_trait]
impl NotificationProvider for LogNotificationProvider {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, message: &PushMessage) -> Result<(), NotifyError> {
        tracing::info!(
            recipients = message.recipients.len(),
            kind = ?message.kind,
            "Push notification: {}",
            message.title
        );
        Ok(())
    }
}

pub fn provider_from_config(config: &NotificationConfig) -> Result<Arc<dyn NotificationProvider>, NotifyError> {
    match &config.provider_url {
        Some(url) => Ok(Arc::new(HttpNotificationProvider::new(
            url,
            config.provider_api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogNotificationProvider)),
    }
}

/// Hand a message to the provider without holding up the request
pub fn dispatch(provider: Arc<dyn NotificationProvider>, message: PushMessage) {
    if message.recipients.is_empty() {
        return;
    }

    tokio::spawn(async move {
        if let Err(e) = provider.deliver(&message).await {
            tracing::warn!("Push delivery via '{}' failed: {}", provider.name(), e);
        }
    });
}

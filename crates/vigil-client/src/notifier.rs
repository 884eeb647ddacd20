//! Maintenance notification dispatch
//!
//! `WebhookNotifier` posts a chat-style JSON message; `LogNotifier` only writes
//! the same message to the log and is used when no webhook is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};
use url::Url;
use vigil_common::{MaintenanceWindow, NotificationKind};
use vigil_maintenance::Notifier;

use crate::config::WebhookConfig;
use crate::error::{ClientError, Result};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Human readable message announcing a transition of `window`
pub fn notification_content(window: &MaintenanceWindow, kind: NotificationKind) -> String {
    match kind {
        NotificationKind::Start => format!(
            "Maintenance started: {} ({} - {})",
            window.title,
            window.start_time.format(TIME_FORMAT),
            window.end_time.format(TIME_FORMAT)
        ),
        NotificationKind::End => format!("Maintenance completed: {}", window.title),
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    content: String,
}

/// Posts maintenance notifications to a webhook
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
    username: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let url = Url::parse(&config.url)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url,
            username: config.username,
        })
    }

    pub async fn send(&self, content: String) -> Result<()> {
        let payload = WebhookPayload {
            username: self.username.as_deref(),
            content,
        };
        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Webhook rejected notification with status {}: {}", status, body);
            return Err(ClientError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Webhook accepted notification");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        window: &MaintenanceWindow,
        kind: NotificationKind,
    ) -> anyhow::Result<()> {
        self.send(notification_content(window, kind)).await?;
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        window: &MaintenanceWindow,
        kind: NotificationKind,
    ) -> anyhow::Result<()> {
        info!(
            window_id = %window.id,
            "{}",
            notification_content(window, kind)
        );
        Ok(())
    }
}

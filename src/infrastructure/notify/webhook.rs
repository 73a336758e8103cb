use crate::domain::error::DomainError;
use crate::domain::ports::notification_sink::{Notification, NotificationSink};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// POSTs each notification as JSON to a webhook (e.g. an n8n workflow).
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .user_agent("productpilot/0.1")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DomainError> {
        let resp = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| DomainError::Notification(format!("webhook request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(DomainError::Notification(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

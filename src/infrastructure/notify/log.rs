use crate::domain::error::DomainError;
use crate::domain::ports::notification_sink::{Notification, NotificationSink};
use async_trait::async_trait;

/// Used when no webhook is configured: events only reach the log.
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DomainError> {
        tracing::info!(
            event = %notification.event,
            payload = %notification.payload,
            "notification"
        );
        Ok(())
    }
}

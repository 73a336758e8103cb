use crate::domain::ports::notification_sink::{Notification, NotificationSink};

/// Deliver a notification, logging instead of failing when the sink
/// rejects it.
pub async fn deliver_best_effort(sink: &dyn NotificationSink, event: &str, payload: serde_json::Value) {
    let notification = Notification::new(event, payload);
    match sink.deliver(&notification).await {
        Ok(()) => tracing::debug!(sink = sink.name(), %event, "notification delivered"),
        Err(e) => tracing::warn!(sink = sink.name(), %event, error = %e, "notification not delivered"),
    }
}

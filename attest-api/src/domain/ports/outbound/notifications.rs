use async_trait::async_trait;

use crate::domain::models::{UserId, WorkflowEvent};

/// Where lifecycle services hand off their domain events.
///
/// Fire and forget: implementations swallow their own failures; a transition
/// is never rolled back because nobody could be told about it.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn publish(&self, event: WorkflowEvent);
}

/// Per-recipient delivery, the last hop before an actual transport
/// (mail, push, ...) which lives outside this service.
#[async_trait]
pub trait NotificationDelivery: Send + Sync + 'static {
    async fn deliver(&self, recipient: UserId, event: &WorkflowEvent);
}

/// Default delivery that just records the notification in the log.
pub struct LoggingDelivery;

#[async_trait]
impl NotificationDelivery for LoggingDelivery {
    async fn deliver(&self, recipient: UserId, event: &WorkflowEvent) {
        tracing::info!(kind = event.kind(), %recipient, "notification");
    }
}

//! Log-only sink, used when no real delivery channel is configured.

use async_trait::async_trait;
use tracing::info;
use veil_core::UserId;

use crate::broadcast::Broadcaster;
use crate::error::NotifyError;
use crate::notification::{Notification, Notifier};

/// Writes every notification and event as a `tracing` event and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            user_id = %notification.recipient.user_id,
            kind = %notification.kind,
            priority = ?notification.priority,
            title = %notification.title,
            "notification"
        );
        Ok(())
    }
}

#[async_trait]
impl Broadcaster for TracingNotifier {
    async fn broadcast_to_all(
        &self,
        event_type: &str,
        _payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(event_type, "broadcast");
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: &UserId,
        event_type: &str,
        _payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(%user_id, event_type, "user event");
        Ok(())
    }
}

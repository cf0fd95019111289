//! Best-effort fan-out used by the engines after a transition commits.

use std::sync::Arc;

use tracing::warn;
use veil_core::UserId;

use crate::broadcast::Broadcaster;
use crate::log_sink::TracingNotifier;
use crate::notification::{Notification, Notifier};

/// A notifier and a broadcaster, driven best-effort.
///
/// None of the methods return an error. A failed delivery is logged at
/// `warn` and otherwise ignored.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            notifier,
            broadcaster,
        }
    }

    /// Dispatcher that only logs.
    pub fn logging() -> Self {
        Self::new(Arc::new(TracingNotifier), Arc::new(TracingNotifier))
    }

    pub async fn notify(&self, notification: Notification) {
        let user_id = notification.recipient.user_id.clone();
        let kind = notification.kind;
        if let Err(e) = self.notifier.send(notification).await {
            warn!(
                sink = self.notifier.name(),
                %user_id,
                %kind,
                error = %e,
                "notification delivery failed"
            );
        }
    }

    pub async fn broadcast(&self, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.broadcaster.broadcast_to_all(event_type, payload).await {
            warn!(event_type, error = %e, "broadcast failed");
        }
    }

    pub async fn to_user(&self, user_id: &UserId, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.broadcaster.send_to_user(user_id, event_type, payload).await {
            warn!(%user_id, event_type, error = %e, "user event failed");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("notifier", &self.notifier.name())
            .finish_non_exhaustive()
    }
}

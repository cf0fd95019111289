//! In-memory in-app inbox.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use veil_core::UserId;

use crate::error::NotifyError;
use crate::notification::{Notification, NotificationKind, Notifier};

/// Per-user notification inbox. Clones share the same storage.
///
/// Only notifications with `channels.in_app` set are kept; email-only
/// notifications are accepted and dropped.
#[derive(Debug, Clone, Default)]
pub struct InAppInbox {
    inner: Arc<RwLock<HashMap<UserId, Vec<Notification>>>>,
}

impl InAppInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// A user's notifications, newest first.
    pub fn for_user(&self, user_id: &UserId) -> Vec<Notification> {
        let mut items = self
            .inner
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        items.reverse();
        items
    }

    /// How many notifications a user has received.
    pub fn count_for(&self, user_id: &UserId) -> usize {
        self.inner.read().get(user_id).map_or(0, Vec::len)
    }

    /// A user's notifications of one kind, oldest first.
    pub fn of_kind(&self, user_id: &UserId, kind: NotificationKind) -> Vec<Notification> {
        self.inner
            .read()
            .get(user_id)
            .map(|items| items.iter().filter(|n| n.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    /// Total notifications stored across all users.
    pub fn total(&self) -> usize {
        self.inner.read().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Notifier for InAppInbox {
    fn name(&self) -> &str {
        "in_app"
    }

    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if !notification.channels.in_app {
            return Ok(());
        }
        self.inner
            .write()
            .entry(notification.recipient.user_id.clone())
            .or_default()
            .push(notification);
        Ok(())
    }
}

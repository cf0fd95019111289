//! Real-time event broadcast.
//!
//! The default implementation fans events out over an in-process
//! `tokio::sync::broadcast` channel. A WebSocket layer subscribes and
//! forwards events whose [`EventTarget`] matches the connected user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use veil_core::UserId;

use crate::error::NotifyError;

/// Default channel capacity. Slow subscribers lag past this and drop events.
pub const BROADCAST_CAPACITY: usize = 1024;

/// Audience of a broadcast event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "userId", rename_all = "lowercase")]
pub enum EventTarget {
    All,
    User(UserId),
}

/// One real-time event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub target: EventTarget,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// Receiver half handed to subscribers.
pub type EventReceiver = broadcast::Receiver<Arc<MarketEvent>>;

/// Marketplace-wide and per-user real-time events.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_to_all(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;

    async fn send_to_user(
        &self,
        user_id: &UserId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// In-memory broadcaster over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Arc<MarketEvent>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, target: EventTarget, event_type: &str, payload: serde_json::Value) {
        let event = Arc::new(MarketEvent {
            target,
            event_type: event_type.to_string(),
            payload,
            emitted_at: Utc::now(),
        });
        // Err only means nobody is listening right now.
        if let Err(e) = self.tx.send(event) {
            debug!(event_type, "broadcast without subscribers: {e}");
        }
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn broadcast_to_all(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.publish(EventTarget::All, event_type, payload);
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: &UserId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.publish(EventTarget::User(user_id.clone()), event_type, payload);
        Ok(())
    }
}

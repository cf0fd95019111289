//! Point-to-point notification contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::{AnonymousId, UserId};

use crate::error::NotifyError;

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub user_id: UserId,
    pub anonymous_id: AnonymousId,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AuctionApproved,
    AuctionRejected,
    EscrowCreated,
    EscrowFunded,
    ItemDelivered,
    DeliveryConfirmed,
    PaymentReleased,
    DisputeFiled,
    DisputeResolved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuctionApproved => "auction_approved",
            Self::AuctionRejected => "auction_rejected",
            Self::EscrowCreated => "escrow_created",
            Self::EscrowFunded => "escrow_funded",
            Self::ItemDelivered => "item_delivered",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::PaymentReleased => "payment_released",
            Self::DisputeFiled => "dispute_filed",
            Self::DisputeResolved => "dispute_resolved",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Delivery channels requested for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Channels {
    pub in_app: bool,
    pub email: bool,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            in_app: true,
            email: false,
        }
    }
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient: Recipient,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub channels: Channels,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// In-app, normal-priority notification with no payload.
    pub fn new(
        recipient: Recipient,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            kind,
            priority: Priority::Normal,
            title: title.into(),
            message: message.into(),
            data: serde_json::Value::Null,
            channels: Channels::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Also deliver by email.
    pub fn with_email(mut self) -> Self {
        self.channels.email = true;
        self
    }
}

/// Point-to-point notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sink name, for logs.
    fn name(&self) -> &str;

    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_serializes_with_type_key() {
        let n = Notification::new(
            Recipient {
                user_id: UserId::new("u1"),
                anonymous_id: AnonymousId::new("anon-u1"),
            },
            NotificationKind::PaymentReleased,
            "Payment released",
            "Funds are on their way",
        )
        .with_priority(Priority::High);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "payment_released");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["channels"]["inApp"], true);
        assert_eq!(json["recipient"]["anonymousId"], "anon-u1");
    }

    #[test]
    fn kind_display_matches_serde() {
        let json = serde_json::to_string(&NotificationKind::DisputeFiled).unwrap();
        assert_eq!(json, format!("\"{}\"", NotificationKind::DisputeFiled));
    }
}

//! # veil-notify — Notification & Broadcast Dispatch
//!
//! The engines talk to users through two collaborator traits:
//!
//! - [`Notifier`]: point-to-point notifications (in-app inbox, email).
//! - [`Broadcaster`]: real-time events, either marketplace-wide or to one user.
//!
//! Both are fire-and-forget from the engines' point of view. The
//! [`Dispatcher`] wraps a pair of them and turns every delivery failure into a
//! `warn!` event, so a transition that already committed is never rolled back
//! because a notification could not be delivered.
//!
//! ## Implementations
//!
//! - [`InAppInbox`]: per-user in-memory inbox; also backs `GET /v1/notifications`.
//! - [`ChannelBroadcaster`]: `tokio::sync::broadcast` fan-out to subscribers.
//! - [`TracingNotifier`]: logs every notification and event.

pub mod broadcast;
pub mod dispatcher;
pub mod error;
pub mod inbox;
pub mod log_sink;
pub mod notification;

pub use broadcast::{Broadcaster, ChannelBroadcaster, EventReceiver, EventTarget, MarketEvent};
pub use dispatcher::Dispatcher;
pub use error::NotifyError;
pub use inbox::InAppInbox;
pub use log_sink::TracingNotifier;
pub use notification::{Channels, Notification, NotificationKind, Notifier, Priority, Recipient};

use thiserror::Error;

/// Delivery failures reported by notifiers and broadcasters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The sink has shut down.
    #[error("notification channel closed")]
    ChannelClosed,

    /// The sink refused the message.
    #[error("notification rejected by {sink}: {reason}")]
    Rejected { sink: String, reason: String },
}

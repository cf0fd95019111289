//! # Marketplace Error Taxonomy
//!
//! Structured errors shared by the escrow and approval engines. Every variant
//! carries enough context to diagnose the failure without inspecting logs:
//! the entity, its identifier, and for state errors the status observed at
//! the time of rejection.
//!
//! Callers branch on [`MarketError::kind`] rather than on message text.

use thiserror::Error;

/// Coarse classification of a [`MarketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Forbidden,
    AccessDenied,
    AlreadyDisputed,
    Validation,
    SettlementFailure,
    TransactionAborted,
    Internal,
}

/// Errors arising from marketplace lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    /// The entity identifier does not resolve.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind ("auction", "escrow").
        entity: &'static str,
        /// The identifier that did not resolve.
        id: String,
    },

    /// The operation is not legal in the entity's current lifecycle status.
    #[error("{entity} {id} cannot {operation} in status {status}")]
    InvalidState {
        /// Entity kind.
        entity: &'static str,
        /// Entity identifier.
        id: String,
        /// The attempted operation (e.g., "mark_delivered").
        operation: &'static str,
        /// The status observed when the operation was rejected.
        status: String,
    },

    /// The actor has no authority to perform this transition.
    #[error("{actor} is not permitted to {operation} {entity} {id}")]
    Forbidden {
        /// Entity kind.
        entity: &'static str,
        /// Entity identifier.
        id: String,
        /// The acting user.
        actor: String,
        /// The attempted operation.
        operation: &'static str,
    },

    /// A read was attempted by someone who is neither buyer nor seller.
    #[error("{user} has no access to escrow {id}")]
    AccessDenied {
        /// Escrow identifier.
        id: String,
        /// The requesting user.
        user: String,
    },

    /// A dispute is already open (or was resolved) on this escrow.
    #[error("escrow {escrow_id} is already disputed")]
    AlreadyDisputed {
        /// Escrow identifier.
        escrow_id: String,
    },

    /// Malformed input, rejected before any state mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The settlement gateway failed or timed out. No local state changed;
    /// the operation can be retried.
    #[error("settlement failed for escrow {escrow_id}: {reason}")]
    SettlementFailure {
        /// Escrow identifier.
        escrow_id: String,
        /// Gateway-reported or timeout reason.
        reason: String,
    },

    /// A multi-record transaction rolled back. Nothing was applied.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Why the transaction aborted.
        reason: String,
    },

    /// Could not allocate a unique identifier within the retry budget.
    #[error("failed to allocate a unique {entity} id after {attempts} attempts")]
    IdExhausted {
        /// Entity kind.
        entity: &'static str,
        /// Attempts made.
        attempts: u32,
    },
}

impl MarketError {
    /// Shorthand for [`MarketError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`MarketError::InvalidState`].
    pub fn invalid_state(
        entity: &'static str,
        id: impl ToString,
        operation: &'static str,
        status: impl ToString,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            operation,
            status: status.to_string(),
        }
    }

    /// Shorthand for [`MarketError::Forbidden`].
    pub fn forbidden(
        entity: &'static str,
        id: impl ToString,
        actor: impl ToString,
        operation: &'static str,
    ) -> Self {
        Self::Forbidden {
            entity,
            id: id.to_string(),
            actor: actor.to_string(),
            operation,
        }
    }

    /// Shorthand for [`MarketError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::AlreadyDisputed { .. } => ErrorKind::AlreadyDisputed,
            Self::Validation(_) => ErrorKind::Validation,
            Self::SettlementFailure { .. } => ErrorKind::SettlementFailure,
            Self::TransactionAborted { .. } => ErrorKind::TransactionAborted,
            Self::IdExhausted { .. } => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only settlement failures qualify: the escrow is left untouched and the
    /// gateway call is keyed by escrow id.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::SettlementFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = MarketError::not_found("auction", "AUC-00000001");
        assert_eq!(err.to_string(), "auction AUC-00000001 not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn invalid_state_display_carries_status() {
        let err =
            MarketError::invalid_state("escrow", "ESC-00000001", "confirm_delivery", "funded");
        let msg = err.to_string();
        assert!(msg.contains("ESC-00000001"));
        assert!(msg.contains("confirm_delivery"));
        assert!(msg.contains("funded"));
    }

    #[test]
    fn forbidden_display() {
        let err = MarketError::forbidden("escrow", "ESC-1", "buyer-9", "mark_delivered");
        assert!(err.to_string().contains("buyer-9"));
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn only_settlement_failure_is_retryable() {
        let retryable = MarketError::SettlementFailure {
            escrow_id: "ESC-1".into(),
            reason: "timeout".into(),
        };
        assert!(retryable.is_retryable());

        let others = [
            MarketError::not_found("escrow", "x"),
            MarketError::validation("bad"),
            MarketError::AlreadyDisputed {
                escrow_id: "ESC-1".into(),
            },
            MarketError::TransactionAborted {
                reason: "conflict".into(),
            },
            MarketError::IdExhausted {
                entity: "escrow",
                attempts: 8,
            },
        ];
        for err in others {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn id_exhaustion_is_internal() {
        let err = MarketError::IdExhausted {
            entity: "escrow",
            attempts: 3,
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains('3'));
    }
}

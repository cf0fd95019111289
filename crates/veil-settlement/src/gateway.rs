//! Gateway contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use veil_core::EscrowId;

/// Proof of an on-chain release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Settlement failures. None of them imply funds moved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    /// The gateway did not answer in time.
    #[error("settlement gateway timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The settlement service refused the release (4xx, revert).
    #[error("release rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// Transport failure or 5xx.
    #[error("settlement service unavailable: {reason}")]
    Unavailable { reason: String },

    /// The service answered with something that is not a receipt.
    #[error("invalid settlement response: {reason}")]
    InvalidResponse { reason: String },

    /// The gateway cannot be used as configured.
    #[error("settlement gateway not configured: {reason}")]
    NotConfigured { reason: String },
}

/// Performs the on-chain release of escrowed funds.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Gateway name, for logs.
    fn name(&self) -> &str;

    /// Release the funds held for `escrow_id` to the seller.
    async fn release(&self, escrow_id: &EscrowId) -> Result<SettlementReceipt, SettlementError>;
}

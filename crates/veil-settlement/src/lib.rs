//! # veil-settlement — Settlement Gateway
//!
//! The escrow engine releases funds through the [`SettlementGateway`] trait.
//! The gateway performs the on-chain release and reports the transaction
//! hash, block number and gas used.
//!
//! ## Idempotency
//!
//! A release is keyed by escrow id. Gateways must not produce more than one
//! externally visible effect per escrow id; [`HttpSettlementGateway`] sends
//! the id as an `Idempotency-Key` header so the settlement service can
//! deduplicate retries.
//!
//! ## Implementations
//!
//! - [`HttpSettlementGateway`]: `POST {base}/escrows/{id}/release`.
//! - [`MockSettlementGateway`]: deterministic in-process gateway with call
//!   counting plus failure and latency injection.

pub mod config;
pub mod gateway;
pub mod http;
pub mod mock;

pub use config::{ConfigError, SettlementConfig};
pub use gateway::{SettlementError, SettlementGateway, SettlementReceipt};
pub use http::HttpSettlementGateway;
pub use mock::MockSettlementGateway;

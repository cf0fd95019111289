//! # veil-escrow — Escrow State Machine
//!
//! Tracks one auction's payment from creation through funding, delivery and
//! release, or into dispute.
//!
//! - **Record** (`record.rs`): [`EscrowRecord`] with its sub-records and the
//!   pure transitions that enforce the status machine and actor rules.
//! - **Service** (`service.rs`): [`EscrowService`], which serializes
//!   transitions per escrow, calls the settlement gateway on release, writes
//!   the release ledger and seller reputation, and dispatches notifications.
//! - **Query** (`query.rs`): party-scoped listing with filters and pagination.
//!
//! ## Authorization
//!
//! Reads are restricted to the escrow's buyer and seller. Delivery is marked
//! by the seller only, confirmed by the buyer only; either may dispute.

pub mod config;
pub mod locks;
pub mod query;
pub mod record;
pub mod service;

pub use config::EscrowConfig;
pub use locks::KeyedLocks;
pub use query::{EscrowFilter, EscrowPage, PartyRole};
pub use record::{
    AuctionRef, BlockchainRecord, DeliveryConfirmation, DeliveryDetails, DeliveryRecord,
    DisputeClaim, DisputeRecord, EscrowRecord, EscrowStatus, Fees, FundingProof, NewEscrow, Party,
    ReleaseRecord, Resolution, TimelineEntry,
};
pub use service::{EscrowService, IdSource, STATUS_EVENT};

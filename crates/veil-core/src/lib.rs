//! # veil-core — Foundational Types for the VeilBid Engine
//!
//! Every other crate in the workspace depends on `veil-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `AuctionId`, `EscrowId`, `DisputeId`, `UserId`,
//!    `AnonymousId` are distinct types. An escrow id cannot be passed where an
//!    auction id is expected.
//!
//! 2. **Records own their transitions.** [`AuctionRecord::approve`] and
//!    [`AuctionRecord::reject`] validate preconditions and mutate in one step,
//!    so every caller (single, bulk, auto) enforces the same invariant.
//!
//! 3. **One error taxonomy.** [`MarketError`] is shared by the escrow and
//!    approval engines. Callers branch on [`ErrorKind`] to decide between
//!    retrying, surfacing a permission error, or investigating.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod auction;
pub mod config;
pub mod error;
pub mod identity;
pub mod profile;

pub use auction::{
    validate_rejection_reason, AuctionRecord, AuctionStatus, AuctionType, Moderation, NewAuction,
    Pricing, MIN_REJECTION_REASON_LEN,
};
pub use config::{env_or, ConfigError};
pub use error::{ErrorKind, MarketError};
pub use identity::{AnonymousId, AuctionId, DisputeId, EscrowId, UserId};
pub use profile::SellerProfile;

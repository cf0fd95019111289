//! # API Route Modules
//!
//! - `auctions`: listing intake by sellers.
//! - `approvals`: the moderation console (admin only).
//! - `escrows`: party-facing escrow lifecycle plus admin creation, funding
//!   and dispute resolution.
//! - `notifications`: the caller's in-app inbox.
//! - `metrics`: request counters for operators.

pub mod approvals;
pub mod auctions;
pub mod escrows;
pub mod metrics;
pub mod notifications;

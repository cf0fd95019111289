//! # veil-cli — Operator CLI for the VeilBid engine
//!
//! Provides the `veil` command-line interface.
//!
//! ## Subcommands
//!
//! - `veil score`: offline risk assessment of an auction JSON file,
//!   optionally against a seller profile. Nothing is contacted.
//! - `veil sweep`: ask a running server to auto-approve low-risk pending
//!   auctions. Dry run unless `--apply` is given.
//!
//! ```bash
//! veil score listing.json --seller seller.json
//! VEIL_TOKEN=admin:ops-1:s3cret veil sweep --apply
//! ```

pub mod score;
pub mod sweep;

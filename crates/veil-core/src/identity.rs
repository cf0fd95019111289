//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the marketplace identifiers. These prevent
//! accidental identifier confusion: you cannot pass a `UserId` where an
//! `EscrowId` is expected.
//!
//! ## Generated Identifier Format
//!
//! Escrow, dispute, and auction identifiers share one textual shape: a fixed
//! prefix followed by an 8-character uppercase hex suffix drawn from 4 bytes
//! of OS randomness.
//!
//! ```text
//! ESC-9F3A01BC   DSP-00C4E2D7   AUC-7B1100FE
//! ```
//!
//! Generation alone does not guarantee uniqueness. Escrow ids are allocated
//! with a retry-until-unique loop against the store (see `veil-escrow`).

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length of the random hex suffix on generated identifiers.
pub const SUFFIX_LEN: usize = 8;

/// Draw 4 random bytes and render them as 8 uppercase hex characters.
pub fn random_suffix() -> String {
    format!("{:08X}", OsRng.next_u32())
}

/// Check that `value` is `prefix` followed by exactly 8 uppercase hex digits.
fn has_generated_shape(value: &str, prefix: &str) -> bool {
    match value.strip_prefix(prefix) {
        Some(suffix) => {
            suffix.len() == SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        }
        None => false,
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Internal marketplace user identifier (buyer, seller, or moderator).
    UserId
);

string_id!(
    /// Wallet-derived anonymous identifier shown to counterparties instead
    /// of the internal user id.
    AnonymousId
);

string_id!(
    /// Stable auction identifier.
    AuctionId
);

string_id!(
    /// Escrow identifier: `ESC-` plus 8 uppercase hex characters.
    EscrowId
);

string_id!(
    /// Dispute identifier: `DSP-` plus 8 uppercase hex characters.
    DisputeId
);

impl AuctionId {
    /// Prefix of generated auction identifiers.
    pub const PREFIX: &'static str = "AUC-";

    /// Generate a fresh auction identifier.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, random_suffix()))
    }
}

impl EscrowId {
    /// Prefix of every escrow identifier.
    pub const PREFIX: &'static str = "ESC-";

    /// Generate a candidate escrow identifier. Uniqueness is the caller's job.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, random_suffix()))
    }

    /// Whether this identifier has the `ESC-XXXXXXXX` shape.
    pub fn is_well_formed(&self) -> bool {
        has_generated_shape(&self.0, Self::PREFIX)
    }
}

impl DisputeId {
    /// Prefix of every dispute identifier.
    pub const PREFIX: &'static str = "DSP-";

    /// Generate a dispute identifier.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, random_suffix()))
    }

    /// Whether this identifier has the `DSP-XXXXXXXX` shape.
    pub fn is_well_formed(&self) -> bool {
        has_generated_shape(&self.0, Self::PREFIX)
    }
}

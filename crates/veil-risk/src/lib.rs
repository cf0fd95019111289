//! # veil-risk — Auction Risk & Priority Scoring
//!
//! Two deterministic, side-effect-free scores over the same inputs:
//!
//! - **Risk assessment** (`assessment.rs`): an additive 0–100 score, a
//!   coarse [`RiskLevel`], and human-readable factors. Shown to moderators
//!   next to each pending auction.
//!
//! - **Priority** (`priority.rs`): a small integer weight that orders the
//!   moderation queue. It shares inputs with the risk score but weights them
//!   differently and adds listing age.
//!
//! A missing seller profile is scored as a brand-new seller (reputation 0.0,
//! no completed auctions). Callers pass `None` rather than inventing a profile.

pub mod assessment;
pub mod priority;

pub use assessment::{assess, RiskAssessment, RiskLevel, RiskSummary};
pub use priority::{priority_score, PRIORITY_AGE_HOURS};

/// Starting bid above which a listing counts as high value.
pub const HIGH_VALUE_THRESHOLD: u64 = 5000;

/// Sellers with fewer completed auctions than this are "new".
pub const NEW_SELLER_AUCTIONS: u32 = 5;

/// Reputation below this is "low".
pub const LOW_REPUTATION: f64 = 3.0;

/// Categories that attract more fraud and get extra scrutiny.
pub const SENSITIVE_CATEGORIES: [&str; 3] = ["electronics", "automotive", "art"];

/// Seller history as the scorers see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SellerHistory {
    pub reputation: f64,
    pub total_auctions: u32,
}

impl SellerHistory {
    pub(crate) fn of(profile: Option<&veil_core::SellerProfile>) -> Self {
        match profile {
            Some(p) => Self {
                reputation: p.reputation,
                total_auctions: p.total_auctions,
            },
            None => Self {
                reputation: 0.0,
                total_auctions: 0,
            },
        }
    }

    pub(crate) fn is_new(&self) -> bool {
        self.total_auctions < NEW_SELLER_AUCTIONS
    }

    pub(crate) fn is_low_reputation(&self) -> bool {
        self.reputation < LOW_REPUTATION
    }
}

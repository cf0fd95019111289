//! Auto-approval eligibility.

use serde::{Deserialize, Serialize};
use veil_core::{env_or, AuctionRecord, ConfigError, SellerProfile};

/// Thresholds a pending auction must meet to skip manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoApprovalPolicy {
    /// Starting bid must be strictly below this.
    pub max_starting_bid: u64,
    /// Seller reputation must be at least this.
    pub min_reputation: f64,
    /// Seller must have completed at least this many auctions.
    pub min_completed_auctions: u32,
}

impl Default for AutoApprovalPolicy {
    fn default() -> Self {
        Self {
            max_starting_bid: 1000,
            min_reputation: 4.0,
            min_completed_auctions: 10,
        }
    }
}

impl AutoApprovalPolicy {
    /// Load overrides from `AUTO_APPROVE_MAX_BID`, `AUTO_APPROVE_MIN_REPUTATION`
    /// and `AUTO_APPROVE_MIN_AUCTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let policy = Self {
            max_starting_bid: env_or("AUTO_APPROVE_MAX_BID", d.max_starting_bid)?,
            min_reputation: env_or("AUTO_APPROVE_MIN_REPUTATION", d.min_reputation)?,
            min_completed_auctions: env_or("AUTO_APPROVE_MIN_AUCTIONS", d.min_completed_auctions)?,
        };
        if !(0.0..=5.0).contains(&policy.min_reputation) {
            return Err(ConfigError::InvalidValue {
                var: "AUTO_APPROVE_MIN_REPUTATION".into(),
                value: policy.min_reputation.to_string(),
            });
        }
        Ok(policy)
    }

    /// Whether `auction` qualifies. A seller without a profile never does.
    pub fn admits(&self, auction: &AuctionRecord, seller: Option<&SellerProfile>) -> bool {
        let Some(seller) = seller else {
            return false;
        };
        auction.awaiting_review()
            && auction.pricing.starting_bid < self.max_starting_bid
            && seller.reputation >= self.min_reputation
            && seller.total_auctions >= self.min_completed_auctions
    }
}

//! Seller reputation profile.

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::identity::UserId;

/// Reputation data the risk scorer and auto-approval policy read.
///
/// `reputation` is the running mean of all ratings received (0.0 when no
/// rating has been recorded yet). `total_auctions` counts completed sales.
///
/// Profiles imported without `ratingCount` but with a reputation keep
/// that reputation weighted by their completed sales, see
/// [`SellerProfile::rating_weight`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub user_id: UserId,
    pub reputation: f64,
    pub total_auctions: u32,
    #[serde(default)]
    pub rating_count: u32,
}

impl SellerProfile {
    /// A seller with no history.
    pub fn new_seller(user_id: UserId) -> Self {
        Self {
            user_id,
            reputation: 0.0,
            total_auctions: 0,
            rating_count: 0,
        }
    }

    /// Fold a buyer rating (1..=5) into the running mean.
    pub fn record_rating(&mut self, rating: u8) -> Result<(), MarketError> {
        if !(1..=5).contains(&rating) {
            return Err(MarketError::validation("rating must be between 1 and 5"));
        }
        let n = f64::from(self.rating_weight());
        self.reputation = (self.reputation * n + f64::from(rating)) / (n + 1.0);
        self.rating_count = self.rating_weight().saturating_add(1);
        Ok(())
    }

    /// Number of ratings the current mean stands for. A non-zero
    /// reputation with no recorded count counts as one rating per
    /// completed sale, and at least one.
    pub fn rating_weight(&self) -> u32 {
        if self.rating_count == 0 && self.reputation > 0.0 {
            self.total_auctions.max(1)
        } else {
            self.rating_count
        }
    }

    /// Count one completed sale.
    pub fn record_completed_auction(&mut self) {
        self.total_auctions = self.total_auctions.saturating_add(1);
    }
}

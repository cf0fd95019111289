//! Queue priority weight.
//!
//! `3×(bid > 5000) + 2×(new seller) + 2×(low reputation) + 1×(age > 24h)`.
//! Higher sorts first.

use chrono::{DateTime, Duration, Utc};
use veil_core::{AuctionRecord, SellerProfile};

use crate::{SellerHistory, HIGH_VALUE_THRESHOLD};

/// Listings older than this many hours get a bump.
pub const PRIORITY_AGE_HOURS: i64 = 24;

/// Priority of a pending auction at `now`.
pub fn priority_score(
    auction: &AuctionRecord,
    seller: Option<&SellerProfile>,
    now: DateTime<Utc>,
) -> u8 {
    let history = SellerHistory::of(seller);
    let mut priority = 0;
    if auction.pricing.starting_bid > HIGH_VALUE_THRESHOLD {
        priority += 3;
    }
    if history.is_new() {
        priority += 2;
    }
    if history.is_low_reputation() {
        priority += 2;
    }
    if now - auction.created_at > Duration::hours(PRIORITY_AGE_HOURS) {
        priority += 1;
    }
    priority
}

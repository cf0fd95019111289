//! # Risk Assessment
//!
//! Additive rules, each contributing independently:
//!
//! | Rule                                   | Points | Factor            |
//! |----------------------------------------|--------|-------------------|
//! | seller has < 5 completed auctions      | +20    | "New seller"      |
//! | starting bid > 5000                    | +15    | "High value item" |
//! | category is electronics/automotive/art | +10    | (none)            |
//! | seller reputation < 3.0                | +25    | "Low reputation"  |
//!
//! The sum is clamped to 100. Level is `high` above 50, `medium` above 25,
//! otherwise `low`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::{AuctionRecord, SellerProfile};

use crate::{SellerHistory, HIGH_VALUE_THRESHOLD, SENSITIVE_CATEGORIES};

const NEW_SELLER_POINTS: u32 = 20;
const HIGH_VALUE_POINTS: u32 = 15;
const CATEGORY_POINTS: u32 = 10;
const LOW_REPUTATION_POINTS: u32 = 25;
const MAX_SCORE: u32 = 100;

/// Coarse risk bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a clamped score.
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s > 50 => Self::High,
            s if s > 25 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

/// Score an auction against its seller's history.
pub fn assess(auction: &AuctionRecord, seller: Option<&SellerProfile>) -> RiskAssessment {
    let history = SellerHistory::of(seller);
    let mut score = 0u32;
    let mut factors = Vec::new();

    if history.is_new() {
        score += NEW_SELLER_POINTS;
        factors.push("New seller".to_string());
    }
    if auction.pricing.starting_bid > HIGH_VALUE_THRESHOLD {
        score += HIGH_VALUE_POINTS;
        factors.push("High value item".to_string());
    }
    if is_sensitive_category(&auction.category) {
        score += CATEGORY_POINTS;
    }
    if history.is_low_reputation() {
        score += LOW_REPUTATION_POINTS;
        factors.push("Low reputation".to_string());
    }

    // Bounded by MAX_SCORE, so the narrowing cannot truncate.
    let score = score.min(MAX_SCORE) as u8;
    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}

fn is_sensitive_category(category: &str) -> bool {
    SENSITIVE_CATEGORIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category.trim()))
}

/// Counts of assessments per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskSummary {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

impl FromIterator<RiskLevel> for RiskSummary {
    fn from_iter<I: IntoIterator<Item = RiskLevel>>(iter: I) -> Self {
        let mut summary = Self::default();
        for level in iter {
            summary.record(level);
        }
        summary
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use veil_core::{AnonymousId, AuctionId, AuctionType, NewAuction, Pricing, UserId};

    proptest! {
        #[test]
        fn score_is_bounded_and_level_consistent(
            bid in 0u64..1_000_000,
            reputation in 0.0f64..5.0,
            total in 0u32..200,
            category in prop::sample::select(vec!["art", "books", "automotive", "toys"]),
        ) {
            let a = AuctionRecord::submitted(
                AuctionId::new("AUC-00000001"),
                NewAuction {
                    seller_id: UserId::new("s"),
                    seller_anonymous_id: AnonymousId::new("a"),
                    title: "t".into(),
                    category: category.into(),
                    auction_type: AuctionType::Forward,
                    pricing: Pricing::starting_at(bid),
                },
                Utc::now(),
            );
            let p = SellerProfile {
                user_id: UserId::new("s"),
                reputation,
                total_auctions: total,
                rating_count: 0,
            };
            let first = assess(&a, Some(&p));
            let second = assess(&a, Some(&p));
            prop_assert!(first.score <= 100);
            prop_assert_eq!(first.level, RiskLevel::from_score(first.score));
            prop_assert_eq!(first, second);
        }
    }
}

//! # Auction Records
//!
//! The auction listing as seen by the moderation pipeline. Only the
//! `pending → active` and `pending → cancelled` transitions belong here;
//! later transitions (ended, relisted) are owned by the auction-closing
//! subsystem.
//!
//! ## Invariants
//!
//! - `status == Active` ⇒ `moderation.is_approved` and `moderation.approved_at.is_some()`.
//! - `status == Cancelled` via rejection ⇒ `!moderation.is_approved` and a
//!   rejection reason of at least [`MIN_REJECTION_REASON_LEN`] characters.
//!
//! Both are enforced by [`AuctionRecord::approve`] and [`AuctionRecord::reject`],
//! the only methods that move an auction out of `Pending`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MarketError;
use crate::identity::{AnonymousId, AuctionId, UserId};

/// Minimum length (after trimming) of a rejection reason.
pub const MIN_REJECTION_REASON_LEN: usize = 10;

/// Lifecycle status of an auction listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    /// Awaiting moderation.
    Pending,
    /// Approved and live.
    Active,
    /// Closed by the auction-closing subsystem.
    Ended,
    /// Rejected by a moderator or withdrawn.
    Cancelled,
}

impl AuctionStatus {
    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auction mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuctionType {
    /// Buyers bid the price up.
    Forward,
    /// Sellers bid the price down.
    Reverse,
}

/// Pricing of a listing, in whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub starting_bid: u64,
    pub current_bid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_now_price: Option<u64>,
}

impl Pricing {
    /// Pricing with only a starting bid set.
    pub fn starting_at(starting_bid: u64) -> Self {
        Self {
            starting_bid,
            current_bid: starting_bid,
            reserve_price: None,
            buy_now_price: None,
        }
    }
}

/// Moderation outcome recorded on an auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    pub is_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fields a seller supplies when submitting a listing for review.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub seller_id: UserId,
    pub seller_anonymous_id: AnonymousId,
    pub title: String,
    pub category: String,
    pub auction_type: AuctionType,
    pub pricing: Pricing,
}

impl NewAuction {
    /// Check submission fields before anything is stored.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.title.trim().is_empty() {
            return Err(MarketError::validation("title must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(MarketError::validation("category must not be empty"));
        }
        if let Some(reserve) = self.pricing.reserve_price {
            if reserve < self.pricing.starting_bid {
                return Err(MarketError::validation(
                    "reserve price must not be below the starting bid",
                ));
            }
        }
        Ok(())
    }
}

/// An auction listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRecord {
    pub auction_id: AuctionId,
    pub seller_id: UserId,
    pub seller_anonymous_id: AnonymousId,
    pub title: String,
    pub category: String,
    #[serde(rename = "type")]
    pub auction_type: AuctionType,
    pub pricing: Pricing,
    pub status: AuctionStatus,
    pub moderation: Moderation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuctionRecord {
    /// Build a `Pending` record from a submission.
    pub fn submitted(auction_id: AuctionId, new: NewAuction, now: DateTime<Utc>) -> Self {
        Self {
            auction_id,
            seller_id: new.seller_id,
            seller_anonymous_id: new.seller_anonymous_id,
            title: new.title.trim().to_string(),
            category: new.category.trim().to_lowercase(),
            auction_type: new.auction_type,
            pricing: new.pricing,
            status: AuctionStatus::Pending,
            moderation: Moderation::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the listing is still waiting for a moderation decision.
    pub fn awaiting_review(&self) -> bool {
        self.status == AuctionStatus::Pending && !self.moderation.is_approved
    }

    /// Approve a pending listing: `Pending → Active`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidState`] unless the auction is `Pending`.
    pub fn approve(
        &mut self,
        moderator: &UserId,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.ensure_pending("approve")?;
        self.status = AuctionStatus::Active;
        self.moderation.is_approved = true;
        self.moderation.approved_by = Some(moderator.clone());
        self.moderation.approved_at = Some(now);
        if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
            self.moderation.notes = Some(notes.to_string());
        }
        self.updated_at = now;
        Ok(())
    }

    /// Reject a pending listing: `Pending → Cancelled`.
    ///
    /// The reason is re-validated here even if the caller already did so.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] for a short reason (checked first), then
    /// [`MarketError::InvalidState`] unless the auction is `Pending`.
    pub fn reject(
        &mut self,
        moderator: &UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        let reason = validate_rejection_reason(reason)?;
        self.ensure_pending("reject")?;
        self.status = AuctionStatus::Cancelled;
        self.moderation.is_approved = false;
        self.moderation.rejected_by = Some(moderator.clone());
        self.moderation.rejected_at = Some(now);
        self.moderation.rejection_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self, operation: &'static str) -> Result<(), MarketError> {
        if self.status != AuctionStatus::Pending {
            return Err(MarketError::invalid_state(
                "auction",
                &self.auction_id,
                operation,
                self.status,
            ));
        }
        Ok(())
    }
}

/// Trim a rejection reason and check its length.
pub fn validate_rejection_reason(reason: &str) -> Result<String, MarketError> {
    let trimmed = reason.trim();
    if trimmed.chars().count() < MIN_REJECTION_REASON_LEN {
        return Err(MarketError::validation(format!(
            "rejection reason must be at least {MIN_REJECTION_REASON_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

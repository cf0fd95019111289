//! Review backlog views: the FIFO pending page and the priority queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::{AuctionRecord, SellerProfile, UserId};
use veil_risk::{assess, priority_score, RiskAssessment, RiskLevel, RiskSummary};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filters for the pending page. Risk counts honour `category` but not
/// `risk_level`, so the summary always shows the full level breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PendingFilter {
    fn default() -> Self {
        Self {
            category: None,
            risk_level: None,
            page: first_page(),
            limit: default_limit(),
        }
    }
}

impl PendingFilter {
    fn admits_category(&self, auction: &AuctionRecord) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| auction.category.eq_ignore_ascii_case(c.trim()))
    }
}

/// A pending auction with its risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub auction: AuctionRecord,
    pub risk: RiskAssessment,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPage {
    pub items: Vec<PendingItem>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
    pub risk_summary: RiskSummary,
}

/// A pending auction positioned in the triage queue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub auction: AuctionRecord,
    pub priority: u8,
    pub risk: RiskAssessment,
    pub wait_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalQueue {
    pub items: Vec<QueueItem>,
    pub total: usize,
    pub average_wait_hours: f64,
    pub max_wait_hours: f64,
}

/// Oldest first, ties broken by id so the order is total.
pub(crate) fn sort_fifo(auctions: &mut [AuctionRecord]) {
    auctions.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.auction_id.cmp(&b.auction_id))
    });
}

pub(crate) fn pending_page(
    mut pending: Vec<AuctionRecord>,
    filter: &PendingFilter,
    profile_of: impl Fn(&UserId) -> Option<SellerProfile>,
) -> PendingPage {
    pending.retain(|a| filter.admits_category(a));
    sort_fifo(&mut pending);

    let assessed: Vec<PendingItem> = pending
        .into_iter()
        .map(|auction| {
            let risk = assess(&auction, profile_of(&auction.seller_id).as_ref());
            PendingItem { auction, risk }
        })
        .collect();
    let risk_summary: RiskSummary = assessed.iter().map(|i| i.risk.level).collect();

    let matching: Vec<PendingItem> = assessed
        .into_iter()
        .filter(|i| filter.risk_level.map_or(true, |l| i.risk.level == l))
        .collect();

    let page = filter.page.max(1);
    let limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
    let total = matching.len();
    let pages = u32::try_from(total.div_ceil(limit as usize)).unwrap_or(u32::MAX);
    let skip = (page as usize - 1).saturating_mul(limit as usize);
    let items = matching.into_iter().skip(skip).take(limit as usize).collect();

    PendingPage {
        items,
        total,
        page,
        limit,
        pages,
        risk_summary,
    }
}

pub(crate) fn approval_queue(
    mut pending: Vec<AuctionRecord>,
    now: DateTime<Utc>,
    profile_of: impl Fn(&UserId) -> Option<SellerProfile>,
) -> ApprovalQueue {
    sort_fifo(&mut pending);
    let mut items: Vec<QueueItem> = pending
        .into_iter()
        .map(|auction| {
            let profile = profile_of(&auction.seller_id);
            QueueItem {
                priority: priority_score(&auction, profile.as_ref(), now),
                risk: assess(&auction, profile.as_ref()),
                wait_hours: wait_hours(&auction, now),
                auction,
            }
        })
        .collect();
    // Stable: equal priorities keep FIFO order.
    items.sort_by(|a, b| b.priority.cmp(&a.priority));

    let total = items.len();
    let (sum, max) = items
        .iter()
        .fold((0.0_f64, 0.0_f64), |(s, m), i| (s + i.wait_hours, m.max(i.wait_hours)));
    let average = if total == 0 { 0.0 } else { sum / total as f64 };

    ApprovalQueue {
        items,
        total,
        average_wait_hours: round1(average),
        max_wait_hours: round1(max),
    }
}

fn wait_hours(auction: &AuctionRecord, now: DateTime<Utc>) -> f64 {
    let secs = (now - auction.created_at).num_seconds().max(0);
    round1(secs as f64 / 3600.0)
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use veil_core::{AnonymousId, AuctionId, AuctionType, NewAuction, Pricing};

    fn auction(
        id: &str,
        seller: &str,
        category: &str,
        bid: u64,
        age_hours: i64,
        now: DateTime<Utc>,
    ) -> AuctionRecord {
        AuctionRecord::submitted(
            AuctionId::new(id),
            NewAuction {
                seller_id: UserId::new(seller),
                seller_anonymous_id: AnonymousId::new(format!("anon-{seller}")),
                title: id.into(),
                category: category.into(),
                auction_type: AuctionType::Forward,
                pricing: Pricing::starting_at(bid),
            },
            now - Duration::hours(age_hours),
        )
    }

    fn veteran(user: &UserId) -> Option<SellerProfile> {
        (user.as_str() == "vet").then(|| SellerProfile {
            user_id: user.clone(),
            reputation: 4.9,
            total_auctions: 80,
            rating_count: 70,
        })
    }

    #[test]
    fn pending_page_is_fifo_and_counts_every_level() {
        let now = Utc::now();
        let pending = vec![
            auction("AUC-3", "vet", "books", 10, 1, now),
            auction("AUC-1", "new", "art", 9000, 5, now),
            auction("AUC-2", "vet", "books", 10, 3, now),
        ];
        let filter = PendingFilter {
            limit: 2,
            ..PendingFilter::default()
        };
        let page = pending_page(pending, &filter, veteran);

        let ids: Vec<_> = page.items.iter().map(|i| i.auction.auction_id.as_str()).collect();
        assert_eq!(ids, vec!["AUC-1", "AUC-2"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        assert_eq!(page.risk_summary.total(), 3);
        assert_eq!(page.risk_summary.high, 1);
        assert_eq!(page.risk_summary.low, 2);
    }

    #[test]
    fn risk_filter_narrows_items_not_summary() {
        let now = Utc::now();
        let pending = vec![
            auction("AUC-1", "new", "art", 9000, 5, now),
            auction("AUC-2", "vet", "books", 10, 3, now),
        ];
        let filter = PendingFilter {
            risk_level: Some(RiskLevel::High),
            ..PendingFilter::default()
        };
        let page = pending_page(pending, &filter, veteran);
        assert_eq!(page.total, 1);
        assert_eq!(page.risk_summary.total(), 2);
    }

    #[test]
    fn category_filter_applies_to_summary() {
        let now = Utc::now();
        let pending = vec![
            auction("AUC-1", "new", "art", 9000, 5, now),
            auction("AUC-2", "vet", "books", 10, 3, now),
        ];
        let filter = PendingFilter {
            category: Some("Books".into()),
            ..PendingFilter::default()
        };
        let page = pending_page(pending, &filter, veteran);
        assert_eq!(page.total, 1);
        assert_eq!(page.risk_summary.total(), 1);
    }

    #[test]
    fn queue_orders_by_priority_then_age() {
        let now = Utc::now();
        let pending = vec![
            auction("AUC-A", "vet", "books", 10, 2, now),
            auction("AUC-B", "vet", "books", 10, 4, now),
            auction("AUC-C", "new", "books", 9000, 1, now),
        ];
        let q = approval_queue(pending, now, veteran);
        let ids: Vec<_> = q.items.iter().map(|i| i.auction.auction_id.as_str()).collect();
        assert_eq!(ids, vec!["AUC-C", "AUC-B", "AUC-A"]);
        assert_eq!(q.items[0].priority, 7);
        assert_eq!(q.max_wait_hours, 4.0);
        assert!((q.average_wait_hours - 2.3).abs() < 1e-9);
    }

    #[test]
    fn empty_queue_has_zero_waits() {
        let q = approval_queue(Vec::new(), Utc::now(), veteran);
        assert_eq!(q.total, 0);
        assert_eq!(q.average_wait_hours, 0.0);
        assert_eq!(q.max_wait_hours, 0.0);
    }
}

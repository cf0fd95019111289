//! # Moderation Service
//!
//! Owns the `pending → {active, cancelled}` step of every auction.
//!
//! Single decisions are a check-and-set on one record. Bulk and automatic
//! approval stage every write in one store transaction, so either the whole
//! batch lands or none of it does. Notifications and broadcasts are sent
//! only after the write commits, once per auction actually approved.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use serde_json::json;
use tracing::{debug, info, warn};
use veil_core::{
    validate_rejection_reason, AuctionId, AuctionRecord, MarketError, NewAuction, SellerProfile,
    UserId,
};
use veil_notify::{Dispatcher, Notification, NotificationKind, Priority, Recipient};
use veil_store::Store;

use crate::policy::AutoApprovalPolicy;
use crate::queue::{self, ApprovalQueue, PendingFilter, PendingPage};
use crate::stats::{self, ApprovalStats, StatsPeriod};

/// Source of candidate auction ids.
pub type IdSource = Arc<dyn Fn() -> AuctionId + Send + Sync>;

/// Broadcast to every client when an auction goes live.
pub const APPROVED_EVENT: &str = "auction_approved";
/// Pushed to the seller when their auction is rejected.
pub const REJECTED_EVENT: &str = "auction_rejected";
/// Moderator recorded on auctions approved by the low-risk sweep.
pub const AUTO_MODERATOR: &str = "system:auto-approval";

const ID_ALLOCATION_ATTEMPTS: u32 = 8;
/// Largest id list accepted by [`ModerationService::bulk_approve`].
pub const MAX_BULK_IDS: usize = 500;

/// Outcome of a bulk approval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkApproval {
    pub count: usize,
    pub approved: Vec<AuctionRecord>,
    /// Ids that were unknown or no longer pending.
    pub skipped: Vec<AuctionId>,
}

/// Outcome of a low-risk sweep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoApproval {
    pub dry_run: bool,
    pub eligible_for_auto_approval: Vec<AuctionRecord>,
    pub approved: Vec<AuctionRecord>,
    pub count: usize,
}

pub struct ModerationService {
    auctions: Store<AuctionId, AuctionRecord>,
    profiles: Store<UserId, SellerProfile>,
    dispatch: Dispatcher,
    policy: AutoApprovalPolicy,
    id_source: IdSource,
}

impl ModerationService {
    pub fn new(
        auctions: Store<AuctionId, AuctionRecord>,
        profiles: Store<UserId, SellerProfile>,
        dispatch: Dispatcher,
        policy: AutoApprovalPolicy,
    ) -> Self {
        Self {
            auctions,
            profiles,
            dispatch,
            policy,
            id_source: Arc::new(AuctionId::generate),
        }
    }

    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    pub fn policy(&self) -> &AutoApprovalPolicy {
        &self.policy
    }

    // -- Intake -----------------------------------------------------------

    /// Store a new listing in `pending`.
    pub async fn submit_for_review(&self, new: NewAuction) -> Result<AuctionRecord, MarketError> {
        new.validate()?;
        let now = Utc::now();
        for _ in 0..ID_ALLOCATION_ATTEMPTS {
            let id = (self.id_source)();
            let record = AuctionRecord::submitted(id.clone(), new.clone(), now);
            if self.auctions.insert_if_absent(id.clone(), record.clone()) {
                info!(
                    auction_id = %id,
                    seller_id = %record.seller_id,
                    category = %record.category,
                    starting_bid = record.pricing.starting_bid,
                    "auction submitted for review"
                );
                return Ok(record);
            }
            debug!(auction_id = %id, "auction id collision, drawing again");
        }
        Err(MarketError::IdExhausted {
            entity: "auction",
            attempts: ID_ALLOCATION_ATTEMPTS,
        })
    }

    pub fn auction(&self, id: &AuctionId) -> Result<AuctionRecord, MarketError> {
        self.auctions
            .get(id)
            .ok_or_else(|| MarketError::not_found("auction", id))
    }

    // -- Queue views ------------------------------------------------------

    /// FIFO page of pending auctions with risk annotations.
    pub fn get_pending_approvals(&self, filter: &PendingFilter) -> PendingPage {
        let pending = self.auctions.filter(AuctionRecord::awaiting_review);
        queue::pending_page(pending, filter, |seller| self.profiles.get(seller))
    }

    /// Every pending auction in triage order.
    pub fn get_approval_queue(&self) -> ApprovalQueue {
        let pending = self.auctions.filter(AuctionRecord::awaiting_review);
        queue::approval_queue(pending, Utc::now(), |seller| self.profiles.get(seller))
    }

    pub fn approval_stats(&self, period: StatsPeriod) -> ApprovalStats {
        stats::compute(&self.auctions.list(), period, Utc::now())
    }

    // -- Single decisions -------------------------------------------------

    /// `pending → active`.
    pub async fn approve_auction(
        &self,
        id: &AuctionId,
        moderator: &UserId,
        notes: Option<&str>,
    ) -> Result<AuctionRecord, MarketError> {
        let now = Utc::now();
        let approved = self
            .auctions
            .try_update(id, |a| {
                a.approve(moderator, notes, now)?;
                Ok::<_, MarketError>(a.clone())
            })
            .ok_or_else(|| MarketError::not_found("auction", id))??;

        info!(auction_id = %id, %moderator, from = "pending", to = "active", "auction approved");
        self.announce_approval(&approved).await;
        Ok(approved)
    }

    /// `pending → cancelled`. The reason is checked before the store is read.
    pub async fn reject_auction(
        &self,
        id: &AuctionId,
        moderator: &UserId,
        reason: &str,
    ) -> Result<AuctionRecord, MarketError> {
        let reason = validate_rejection_reason(reason)?;
        let now = Utc::now();
        let rejected = self
            .auctions
            .try_update(id, |a| {
                a.reject(moderator, &reason, now)?;
                Ok::<_, MarketError>(a.clone())
            })
            .ok_or_else(|| MarketError::not_found("auction", id))??;

        info!(auction_id = %id, %moderator, from = "pending", to = "cancelled", "auction rejected");
        self.dispatch
            .notify(
                Notification::new(
                    seller_of(&rejected),
                    NotificationKind::AuctionRejected,
                    "Auction not approved",
                    format!("\"{}\" was not approved: {reason}", rejected.title),
                )
                .with_priority(Priority::High)
                .with_email()
                .with_data(json!({ "auctionId": rejected.auction_id, "reason": reason })),
            )
            .await;
        self.dispatch
            .to_user(
                &rejected.seller_id,
                REJECTED_EVENT,
                json!({ "auctionId": rejected.auction_id, "reason": reason }),
            )
            .await;
        Ok(rejected)
    }

    // -- Batch decisions --------------------------------------------------

    /// Approve every listed auction that is still pending, atomically.
    ///
    /// Unknown and already-decided ids are skipped, not errors. A failure
    /// inside the transaction aborts the whole batch with
    /// [`MarketError::TransactionAborted`] and sends nothing.
    pub async fn bulk_approve(
        &self,
        ids: &[AuctionId],
        moderator: &UserId,
        notes: Option<&str>,
    ) -> Result<BulkApproval, MarketError> {
        if ids.is_empty() {
            return Err(MarketError::validation("auction id list is empty"));
        }
        if ids.len() > MAX_BULK_IDS {
            return Err(MarketError::validation(format!(
                "at most {MAX_BULK_IDS} auctions per bulk approval"
            )));
        }

        let outcome = self.approve_batch(ids, moderator, notes, |_| Ok(true))?;
        info!(
            %moderator,
            requested = ids.len(),
            approved = outcome.count,
            skipped = outcome.skipped.len(),
            "bulk approval committed"
        );
        for auction in &outcome.approved {
            self.announce_approval(auction).await;
        }
        Ok(outcome)
    }

    /// Approve every pending auction the policy admits, or just list them
    /// when `dry_run` is set.
    ///
    /// The listing reads a profile snapshot. The commit re-reads each
    /// seller's profile inside the auction transaction, so a seller whose
    /// profile dropped below the policy in between is skipped.
    pub async fn auto_approve_low_risk(
        &self,
        dry_run: bool,
        triggered_by: &UserId,
    ) -> Result<AutoApproval, MarketError> {
        let profiles: HashMap<UserId, SellerProfile> = self
            .profiles
            .list()
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();
        let admitted = |a: &AuctionRecord| self.policy.admits(a, profiles.get(&a.seller_id));

        let mut eligible = self.auctions.filter(|a| admitted(a));
        queue::sort_fifo(&mut eligible);

        if dry_run || eligible.is_empty() {
            debug!(%triggered_by, dry_run, eligible = eligible.len(), "auto-approval sweep");
            return Ok(AutoApproval {
                dry_run,
                eligible_for_auto_approval: eligible,
                approved: Vec::new(),
                count: 0,
            });
        }

        let ids: Vec<AuctionId> = eligible.iter().map(|a| a.auction_id.clone()).collect();
        let outcome = self.commit_auto_approval(&ids, triggered_by)?;
        info!(
            %triggered_by,
            eligible = eligible.len(),
            approved = outcome.count,
            "auto-approval committed"
        );
        for auction in &outcome.approved {
            self.announce_approval(auction).await;
        }
        Ok(AutoApproval {
            dry_run,
            eligible_for_auto_approval: eligible,
            count: outcome.count,
            approved: outcome.approved,
        })
    }

    fn commit_auto_approval(
        &self,
        ids: &[AuctionId],
        triggered_by: &UserId,
    ) -> Result<BulkApproval, MarketError> {
        let notes = format!("Auto-approved as low risk (sweep by {triggered_by})");
        self.approve_batch(ids, &UserId::new(AUTO_MODERATOR), Some(&notes), |a| {
            let seller = self.profiles.get(&a.seller_id);
            Ok(self.policy.admits(a, seller.as_ref()))
        })
    }

    /// Transactional phase shared by bulk and automatic approval.
    ///
    /// `admit` is consulted for each auction still pending inside the
    /// transaction. `Ok(false)` skips it, `Err` aborts the batch.
    fn approve_batch(
        &self,
        ids: &[AuctionId],
        moderator: &UserId,
        notes: Option<&str>,
        admit: impl Fn(&AuctionRecord) -> Result<bool, MarketError>,
    ) -> Result<BulkApproval, MarketError> {
        let now = Utc::now();
        self.auctions
            .transact(|txn| -> Result<BulkApproval, MarketError> {
                let mut approved = Vec::new();
                let mut skipped = Vec::new();
                for id in ids {
                    let admitted = match txn.get(id) {
                        Some(current) if current.awaiting_review() => admit(current)?,
                        _ => false,
                    };
                    if !admitted {
                        skipped.push(id.clone());
                        continue;
                    }
                    let record = txn
                        .try_update(id, |a| {
                            a.approve(moderator, notes, now)?;
                            Ok::<_, MarketError>(a.clone())
                        })
                        .ok_or_else(|| MarketError::not_found("auction", id))??;
                    approved.push(record);
                }
                Ok(BulkApproval {
                    count: approved.len(),
                    approved,
                    skipped,
                })
            })
            .map_err(|e| {
                warn!(%moderator, error = %e, "approval batch rolled back");
                MarketError::TransactionAborted {
                    reason: e.to_string(),
                }
            })
    }

    async fn announce_approval(&self, auction: &AuctionRecord) {
        self.dispatch
            .notify(
                Notification::new(
                    seller_of(auction),
                    NotificationKind::AuctionApproved,
                    "Auction approved",
                    format!("\"{}\" is now live.", auction.title),
                )
                .with_data(json!({ "auctionId": auction.auction_id })),
            )
            .await;
        self.dispatch
            .broadcast(
                APPROVED_EVENT,
                json!({
                    "auctionId": auction.auction_id,
                    "title": auction.title,
                    "category": auction.category,
                    "type": auction.auction_type,
                    "startingBid": auction.pricing.starting_bid,
                    "sellerAnonymousId": auction.seller_anonymous_id,
                }),
            )
            .await;
    }
}

fn seller_of(auction: &AuctionRecord) -> Recipient {
    Recipient {
        user_id: auction.seller_id.clone(),
        anonymous_id: auction.seller_anonymous_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{AnonymousId, AuctionStatus, AuctionType, ErrorKind, Pricing};
    use veil_notify::{ChannelBroadcaster, InAppInbox};

    fn service() -> (ModerationService, InAppInbox) {
        let inbox = InAppInbox::new();
        let dispatch = Dispatcher::new(
            Arc::new(inbox.clone()),
            Arc::new(ChannelBroadcaster::new()),
        );
        let svc = ModerationService::new(
            Store::new(),
            Store::new(),
            dispatch,
            AutoApprovalPolicy::default(),
        );
        (svc, inbox)
    }

    fn listing(title: &str) -> NewAuction {
        NewAuction {
            seller_id: UserId::new("seller"),
            seller_anonymous_id: AnonymousId::new("anon"),
            title: title.into(),
            category: "books".into(),
            auction_type: AuctionType::Forward,
            pricing: Pricing::starting_at(100),
        }
    }

    #[tokio::test]
    async fn failing_admit_rolls_back_whole_batch() {
        let (svc, inbox) = service();
        let a = svc.submit_for_review(listing("first")).await.unwrap();
        let b = svc.submit_for_review(listing("second")).await.unwrap();
        let ids = vec![a.auction_id.clone(), b.auction_id.clone()];
        let poisoned = b.auction_id.clone();

        let err = svc
            .approve_batch(&ids, &UserId::new("admin"), None, |rec| {
                if rec.auction_id == poisoned {
                    Err(MarketError::validation("poisoned"))
                } else {
                    Ok(true)
                }
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionAborted);
        assert_eq!(svc.auction(&a.auction_id).unwrap().status, AuctionStatus::Pending);
        assert_eq!(svc.auction(&b.auction_id).unwrap().status, AuctionStatus::Pending);
        assert_eq!(inbox.total(), 0);
    }

    #[tokio::test]
    async fn auto_approval_commit_rereads_seller_profile() {
        let (svc, _) = service();
        let seller = UserId::new("seller");
        svc.profiles.insert(
            seller.clone(),
            SellerProfile {
                user_id: seller.clone(),
                reputation: 4.8,
                total_auctions: 30,
                rating_count: 30,
            },
        );
        let a = svc.submit_for_review(listing("cheap")).await.unwrap();

        let listed = svc.auto_approve_low_risk(true, &UserId::new("admin")).await.unwrap();
        assert_eq!(listed.eligible_for_auto_approval.len(), 1);

        svc.profiles.update(&seller, |p| p.reputation = 2.0);
        let out = svc
            .commit_auto_approval(&[a.auction_id.clone()], &UserId::new("admin"))
            .unwrap();
        assert_eq!(out.count, 0);
        assert_eq!(out.skipped, vec![a.auction_id.clone()]);
        assert_eq!(svc.auction(&a.auction_id).unwrap().status, AuctionStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_ids_in_batch_approve_once() {
        let (svc, inbox) = service();
        let a = svc.submit_for_review(listing("only")).await.unwrap();
        let ids = vec![a.auction_id.clone(), a.auction_id.clone()];

        let out = svc.bulk_approve(&ids, &UserId::new("admin"), None).await.unwrap();
        assert_eq!(out.count, 1);
        assert_eq!(out.skipped, vec![a.auction_id.clone()]);
        assert_eq!(inbox.count_for(&UserId::new("seller")), 1);
    }

    #[tokio::test]
    async fn submission_exhausts_ids_on_constant_source() {
        let (svc, _) = service();
        let svc = svc.with_id_source(Arc::new(|| AuctionId::new("AUC-00000000")));
        svc.submit_for_review(listing("one")).await.unwrap();
        let err = svc.submit_for_review(listing("two")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn empty_bulk_is_validation_error() {
        let (svc, _) = service();
        let err = svc.bulk_approve(&[], &UserId::new("admin"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

//! # Moderation Scenarios
//!
//! `ModerationService` against the in-memory store, the in-app inbox and a
//! subscribed channel broadcaster.

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use veil_approval::{
    AutoApprovalPolicy, ModerationService, PendingFilter, StatsPeriod, APPROVED_EVENT,
    AUTO_MODERATOR, REJECTED_EVENT,
};
use veil_core::{
    AnonymousId, AuctionId, AuctionRecord, AuctionStatus, AuctionType, ErrorKind, NewAuction,
    Pricing, SellerProfile, UserId,
};
use veil_notify::{
    ChannelBroadcaster, Dispatcher, EventReceiver, EventTarget, InAppInbox, NotificationKind,
    Priority,
};
use veil_store::Store;

struct Harness {
    service: ModerationService,
    auctions: Store<AuctionId, AuctionRecord>,
    profiles: Store<UserId, SellerProfile>,
    inbox: InAppInbox,
    events: EventReceiver,
}

fn harness() -> Harness {
    let auctions = Store::new();
    let profiles = Store::new();
    let inbox = InAppInbox::new();
    let broadcaster = ChannelBroadcaster::new();
    let events = broadcaster.subscribe();
    let service = ModerationService::new(
        auctions.clone(),
        profiles.clone(),
        Dispatcher::new(Arc::new(inbox.clone()), Arc::new(broadcaster)),
        AutoApprovalPolicy::default(),
    );
    Harness {
        service,
        auctions,
        profiles,
        inbox,
        events,
    }
}

fn admin() -> UserId {
    UserId::new("admin-1")
}

fn listing(seller: &str, title: &str, starting_bid: u64) -> NewAuction {
    NewAuction {
        seller_id: UserId::new(seller),
        seller_anonymous_id: AnonymousId::new(format!("anon-{seller}")),
        title: title.into(),
        category: "collectibles".into(),
        auction_type: AuctionType::Forward,
        pricing: Pricing::starting_at(starting_bid),
    }
}

fn profile(seller: &str, reputation: f64, total_auctions: u32) -> SellerProfile {
    SellerProfile {
        user_id: UserId::new(seller),
        reputation,
        total_auctions,
        rating_count: total_auctions,
    }
}

fn drain(events: &mut EventReceiver) -> Vec<(EventTarget, String)> {
    let mut out = Vec::new();
    while let Ok(e) = events.try_recv() {
        out.push((e.target.clone(), e.event_type.clone()));
    }
    out
}

// -- Single decisions ---------------------------------------------------------

#[tokio::test]
async fn approve_twice_succeeds_once_without_renotifying() {
    let mut h = harness();
    let a = h
        .service
        .submit_for_review(listing("seller-1", "Vintage camera", 300))
        .await
        .unwrap();
    assert!(a.auction_id.as_str().starts_with("AUC-"));
    assert_eq!(a.status, AuctionStatus::Pending);

    let approved = h
        .service
        .approve_auction(&a.auction_id, &admin(), Some("looks fine"))
        .await
        .unwrap();
    assert_eq!(approved.status, AuctionStatus::Active);
    assert!(approved.moderation.is_approved);
    assert_eq!(approved.moderation.approved_by, Some(admin()));
    assert!(approved.moderation.approved_at.is_some());
    assert_eq!(approved.moderation.notes.as_deref(), Some("looks fine"));

    let err = h
        .service
        .approve_auction(&a.auction_id, &admin(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let seller = UserId::new("seller-1");
    assert_eq!(
        h.inbox.of_kind(&seller, NotificationKind::AuctionApproved).len(),
        1
    );
    let events = drain(&mut h.events);
    assert_eq!(events, vec![(EventTarget::All, APPROVED_EVENT.to_string())]);
}

#[tokio::test]
async fn approve_unknown_auction_is_not_found() {
    let h = harness();
    let err = h
        .service
        .approve_auction(&AuctionId::new("AUC-DEADBEEF"), &admin(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn short_rejection_reason_fails_before_lookup() {
    let h = harness();
    // Unknown id: validation still wins because the store is never read.
    let err = h
        .service
        .reject_auction(&AuctionId::new("AUC-DEADBEEF"), &admin(), "bad")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn rejection_cancels_and_pushes_to_seller_only() {
    let mut h = harness();
    let a = h
        .service
        .submit_for_review(listing("seller-1", "Blurry listing", 300))
        .await
        .unwrap();

    let err = h
        .service
        .reject_auction(&a.auction_id, &admin(), "bad")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        h.auctions.get(&a.auction_id).unwrap().status,
        AuctionStatus::Pending
    );

    let rejected = h
        .service
        .reject_auction(&a.auction_id, &admin(), "  Not enough detail provided  ")
        .await
        .unwrap();
    assert_eq!(rejected.status, AuctionStatus::Cancelled);
    assert!(!rejected.moderation.is_approved);
    assert_eq!(
        rejected.moderation.rejection_reason.as_deref(),
        Some("Not enough detail provided")
    );

    let seller = UserId::new("seller-1");
    let notes = h.inbox.of_kind(&seller, NotificationKind::AuctionRejected);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].priority, Priority::High);

    let events = drain(&mut h.events);
    assert_eq!(
        events,
        vec![(EventTarget::User(seller), REJECTED_EVENT.to_string())]
    );
}

// -- Bulk ---------------------------------------------------------------------

#[tokio::test]
async fn bulk_skips_already_active_auction() {
    let mut h = harness();
    let a = h.service.submit_for_review(listing("s-a", "A", 10)).await.unwrap();
    let b = h.service.submit_for_review(listing("s-b", "B", 10)).await.unwrap();
    let c = h.service.submit_for_review(listing("s-c", "C", 10)).await.unwrap();
    h.service.approve_auction(&b.auction_id, &admin(), None).await.unwrap();
    let before_b = h.auctions.get(&b.auction_id).unwrap();
    drain(&mut h.events);

    let ids = vec![a.auction_id.clone(), b.auction_id.clone(), c.auction_id.clone()];
    let out = h.service.bulk_approve(&ids, &admin(), Some("batch")).await.unwrap();

    assert_eq!(out.count, 2);
    let approved: Vec<_> = out.approved.iter().map(|r| r.auction_id.clone()).collect();
    assert_eq!(approved, vec![a.auction_id.clone(), c.auction_id.clone()]);
    assert_eq!(out.skipped, vec![b.auction_id.clone()]);
    assert!(out.approved.iter().all(|r| r.status == AuctionStatus::Active));

    assert_eq!(h.auctions.get(&b.auction_id).unwrap(), before_b);
    assert_eq!(
        h.auctions.get(&a.auction_id).unwrap().moderation.notes.as_deref(),
        Some("batch")
    );

    // One notification per seller, one broadcast per approved auction.
    assert_eq!(h.inbox.count_for(&UserId::new("s-a")), 1);
    assert_eq!(h.inbox.count_for(&UserId::new("s-b")), 1);
    assert_eq!(h.inbox.count_for(&UserId::new("s-c")), 1);
    assert_eq!(drain(&mut h.events).len(), 2);
}

#[tokio::test]
async fn bulk_with_unknown_ids_only_approves_nothing() {
    let h = harness();
    let out = h
        .service
        .bulk_approve(&[AuctionId::new("AUC-00000000")], &admin(), None)
        .await
        .unwrap();
    assert_eq!(out.count, 0);
    assert_eq!(h.inbox.total(), 0);
}

// -- Auto-approval ------------------------------------------------------------

async fn seed_sweep(h: &Harness) -> (AuctionId, AuctionId, AuctionId) {
    h.profiles.insert(UserId::new("trusted"), profile("trusted", 4.5, 12));
    h.profiles.insert(UserId::new("novice"), profile("novice", 4.8, 2));
    let eligible = h
        .service
        .submit_for_review(listing("trusted", "Paperback lot", 100))
        .await
        .unwrap();
    let pricey = h
        .service
        .submit_for_review(listing("trusted", "Signed print", 1000))
        .await
        .unwrap();
    let novice = h
        .service
        .submit_for_review(listing("novice", "Stamp album", 100))
        .await
        .unwrap();
    (eligible.auction_id, pricey.auction_id, novice.auction_id)
}

#[tokio::test]
async fn dry_run_lists_eligible_and_mutates_nothing() {
    let mut h = harness();
    let (eligible, _, _) = seed_sweep(&h).await;
    let before = {
        let mut all = h.auctions.list();
        all.sort_by(|a, b| a.auction_id.cmp(&b.auction_id));
        all
    };

    let out = h.service.auto_approve_low_risk(true, &admin()).await.unwrap();
    assert!(out.dry_run);
    let ids: Vec<_> = out
        .eligible_for_auto_approval
        .iter()
        .map(|a| a.auction_id.clone())
        .collect();
    assert_eq!(ids, vec![eligible]);
    assert_eq!(out.count, 0);
    assert!(out.approved.is_empty());

    let after = {
        let mut all = h.auctions.list();
        all.sort_by(|a, b| a.auction_id.cmp(&b.auction_id));
        all
    };
    assert_eq!(before, after);
    assert_eq!(h.inbox.total(), 0);
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn sweep_approves_only_eligible() {
    let h = harness();
    let (eligible, pricey, novice) = seed_sweep(&h).await;

    let out = h.service.auto_approve_low_risk(false, &admin()).await.unwrap();
    assert!(!out.dry_run);
    assert_eq!(out.count, 1);

    let approved = h.auctions.get(&eligible).unwrap();
    assert_eq!(approved.status, AuctionStatus::Active);
    assert_eq!(
        approved.moderation.approved_by,
        Some(UserId::new(AUTO_MODERATOR))
    );
    assert_eq!(h.auctions.get(&pricey).unwrap().status, AuctionStatus::Pending);
    assert_eq!(h.auctions.get(&novice).unwrap().status, AuctionStatus::Pending);
    assert_eq!(
        h.inbox
            .of_kind(&UserId::new("trusted"), NotificationKind::AuctionApproved)
            .len(),
        1
    );

    // Nothing left to sweep.
    let again = h.service.auto_approve_low_risk(false, &admin()).await.unwrap();
    assert_eq!(again.count, 0);
    assert!(again.eligible_for_auto_approval.is_empty());
}

// -- Views --------------------------------------------------------------------

#[tokio::test]
async fn pending_and_queue_exclude_decided_auctions() {
    let h = harness();
    let a = h.service.submit_for_review(listing("s-a", "A", 10)).await.unwrap();
    let b = h.service.submit_for_review(listing("s-b", "B", 9000)).await.unwrap();
    h.service.approve_auction(&a.auction_id, &admin(), None).await.unwrap();

    let page = h.service.get_pending_approvals(&PendingFilter::default());
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].auction.auction_id, b.auction_id);
    assert_eq!(page.risk_summary.total(), 1);

    let queue = h.service.get_approval_queue();
    assert_eq!(queue.total, 1);
    assert_eq!(queue.items[0].auction.auction_id, b.auction_id);
}

#[tokio::test]
async fn queue_bumps_old_listings() {
    let h = harness();
    h.profiles.insert(UserId::new("vet"), profile("vet", 4.9, 40));
    let fresh = h.service.submit_for_review(listing("vet", "Fresh", 10)).await.unwrap();
    let stale = h.service.submit_for_review(listing("vet", "Stale", 10)).await.unwrap();
    h.auctions.update(&stale.auction_id, |a| {
        a.created_at = Utc::now() - Duration::hours(30);
    });

    let queue = h.service.get_approval_queue();
    let order: Vec<_> = queue.items.iter().map(|i| i.auction.auction_id.clone()).collect();
    assert_eq!(order, vec![stale.auction_id, fresh.auction_id]);
    assert_eq!(queue.items[0].priority, 1);
    assert!(queue.max_wait_hours >= 30.0);
}

#[tokio::test]
async fn stats_count_todays_decisions() {
    let h = harness();
    let a = h.service.submit_for_review(listing("s-a", "A", 10)).await.unwrap();
    let b = h.service.submit_for_review(listing("s-b", "B", 10)).await.unwrap();
    let c = h.service.submit_for_review(listing("s-c", "C", 10)).await.unwrap();
    h.service.approve_auction(&a.auction_id, &admin(), None).await.unwrap();
    h.service.approve_auction(&b.auction_id, &admin(), None).await.unwrap();
    h.service
        .reject_auction(&c.auction_id, &admin(), "Prohibited item category")
        .await
        .unwrap();

    let stats = h.service.approval_stats(StatsPeriod::Day);
    assert_eq!(stats.totals.approved, 2);
    assert_eq!(stats.totals.rejected, 1);
    assert_eq!(stats.totals.approval_rate, 66.7);
    assert_eq!(stats.by_moderator.len(), 1);
    assert_eq!(stats.by_category[0].category, "collectibles");
}

#[tokio::test]
async fn stats_without_decisions_report_zero_rate() {
    let h = harness();
    h.service.submit_for_review(listing("s-a", "A", 10)).await.unwrap();
    let stats = h.service.approval_stats(StatsPeriod::Month);
    assert_eq!(stats.totals.approval_rate, 0.0);
    assert!(stats.by_day.is_empty());
}

// -- Properties ---------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After any mix of approvals, rejections and a bulk pass, `active`
    /// holds exactly when the moderation flag does.
    #[test]
    fn active_iff_approved(decisions in proptest::collection::vec(0u8..3, 1..12)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let h = harness();
            let mut ids = Vec::new();
            for (i, d) in decisions.iter().enumerate() {
                let a = h
                    .service
                    .submit_for_review(listing("s", &format!("Lot {i}"), 10))
                    .await
                    .unwrap();
                match d {
                    0 => {
                        h.service.approve_auction(&a.auction_id, &admin(), None).await.unwrap();
                    }
                    1 => {
                        h.service
                            .reject_auction(&a.auction_id, &admin(), "Missing photographs")
                            .await
                            .unwrap();
                    }
                    _ => {}
                }
                ids.push(a.auction_id);
            }
            h.service.bulk_approve(&ids, &admin(), None).await.unwrap();

            for a in h.auctions.list() {
                prop_assert_eq!(a.status == AuctionStatus::Active, a.moderation.is_approved);
                prop_assert_ne!(a.status, AuctionStatus::Pending);
            }
            Ok(())
        })?;
    }
}

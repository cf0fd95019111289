//! # Escrow Service
//!
//! Drives [`EscrowRecord`] transitions against the shared store, the
//! settlement gateway and the notification dispatcher.
//!
//! ## Linearizability
//!
//! Every mutating operation takes the per-escrow async lock before reading
//! the record and holds it until the store write lands. The release path
//! holds it across the settlement round trip, so two concurrent
//! confirmations of the same escrow produce one gateway call and one
//! `released` transition; the loser observes `InvalidState`. The store write
//! itself is a check-and-set via [`Store::try_update`].
//!
//! ## Side Effects
//!
//! Notifications and user events are sent after the store write and after
//! the lock is released. They are best-effort: a failed delivery is logged
//! and never undoes the transition.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};
use veil_core::{DisputeId, EscrowId, MarketError, SellerProfile, UserId};
use veil_notify::{Dispatcher, Notification, NotificationKind, Priority, Recipient};
use veil_settlement::{SettlementGateway, SettlementReceipt};
use veil_store::Store;

use crate::config::EscrowConfig;
use crate::locks::KeyedLocks;
use crate::query::{EscrowFilter, EscrowPage};
use crate::record::{
    DeliveryConfirmation, DeliveryDetails, DisputeClaim, EscrowRecord, EscrowStatus, Fees,
    FundingProof, NewEscrow, Party, ReleaseRecord, Resolution,
};

/// Source of candidate escrow ids.
pub type IdSource = Arc<dyn Fn() -> EscrowId + Send + Sync>;

/// Event pushed to a party on every status change.
pub const STATUS_EVENT: &str = "escrow_status_changed";

/// The escrow engine.
pub struct EscrowService {
    escrows: Store<EscrowId, EscrowRecord>,
    profiles: Store<UserId, SellerProfile>,
    releases: Store<EscrowId, ReleaseRecord>,
    gateway: Arc<dyn SettlementGateway>,
    dispatch: Dispatcher,
    locks: KeyedLocks<EscrowId>,
    config: EscrowConfig,
    id_source: IdSource,
}

impl EscrowService {
    pub fn new(
        escrows: Store<EscrowId, EscrowRecord>,
        profiles: Store<UserId, SellerProfile>,
        gateway: Arc<dyn SettlementGateway>,
        dispatch: Dispatcher,
        config: EscrowConfig,
    ) -> Self {
        Self {
            escrows,
            profiles,
            releases: Store::new(),
            gateway,
            dispatch,
            locks: KeyedLocks::new(),
            config,
            id_source: Arc::new(EscrowId::generate),
        }
    }

    /// Replace the escrow id generator.
    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    // -- Creation & funding ---------------------------------------------------

    /// Open an escrow for a concluded auction.
    ///
    /// At most one escrow exists per auction. The id is drawn until it does
    /// not collide with a stored one, up to `id_allocation_attempts` draws.
    pub async fn create_escrow(
        &self,
        new: NewEscrow,
        created_by: &UserId,
    ) -> Result<EscrowRecord, MarketError> {
        new.validate()?;
        let fees = Fees::for_amount(
            new.amount,
            self.config.platform_fee_bps,
            self.config.arbitration_fee_bps,
        );
        let attempts = self.config.id_allocation_attempts;
        let now = Utc::now();

        let record = self.escrows.transact(|txn| {
            if txn
                .values()
                .iter()
                .any(|e| e.auction.auction_id == new.auction.auction_id)
            {
                return Err(MarketError::invalid_state(
                    "auction",
                    &new.auction.auction_id,
                    "create_escrow",
                    "escrowed",
                ));
            }
            for _ in 0..attempts {
                let id = (self.id_source)();
                if txn.get(&id).is_some() {
                    debug!(escrow_id = %id, "escrow id collision, drawing again");
                    continue;
                }
                let record = EscrowRecord::open(id.clone(), new.clone(), fees, created_by, now);
                txn.put(id, record.clone());
                return Ok(record);
            }
            Err(MarketError::IdExhausted {
                entity: "escrow",
                attempts,
            })
        })?;

        info!(
            escrow_id = %record.escrow_id,
            auction_id = %record.auction.auction_id,
            amount = record.amount,
            "escrow created"
        );

        for party in [&record.buyer, &record.seller] {
            self.dispatch
                .notify(
                    Notification::new(
                        recipient(party),
                        NotificationKind::EscrowCreated,
                        "Escrow created",
                        format!(
                            "An escrow of {} has been opened for \"{}\".",
                            record.amount, record.auction.title
                        ),
                    )
                    .with_data(escrow_data(&record)),
                )
                .await;
        }
        Ok(record)
    }

    /// `created → funded`, reported by the funding watcher or an admin.
    pub async fn record_funding(
        &self,
        escrow_id: &EscrowId,
        proof: FundingProof,
        actor: &UserId,
    ) -> Result<EscrowRecord, MarketError> {
        let updated = {
            let _guard = self.locks.acquire(escrow_id).await;
            self.transition(escrow_id, |e| e.fund(&proof, actor, Utc::now()))?
        };
        log_transition(&updated, actor, EscrowStatus::Created);

        self.dispatch
            .notify(
                Notification::new(
                    recipient(&updated.seller),
                    NotificationKind::EscrowFunded,
                    "Payment secured",
                    format!(
                        "The buyer's payment for \"{}\" is held in escrow. Please ship the item.",
                        updated.auction.title
                    ),
                )
                .with_priority(Priority::High)
                .with_data(escrow_data(&updated)),
            )
            .await;
        self.push_status(&updated, &[&updated.buyer, &updated.seller]).await;
        Ok(updated)
    }

    // -- Delivery & release ---------------------------------------------------

    /// `funded → delivered`, by the seller.
    pub async fn mark_delivered(
        &self,
        escrow_id: &EscrowId,
        actor: &UserId,
        details: DeliveryDetails,
    ) -> Result<EscrowRecord, MarketError> {
        details.validate()?;
        let updated = {
            let _guard = self.locks.acquire(escrow_id).await;
            self.transition(escrow_id, |e| e.mark_delivered(actor, &details, Utc::now()))?
        };
        log_transition(&updated, actor, EscrowStatus::Funded);

        self.dispatch
            .notify(
                Notification::new(
                    recipient(&updated.buyer),
                    NotificationKind::ItemDelivered,
                    "Item shipped",
                    format!(
                        "\"{}\" was shipped via {} (tracking {}). \
                         Confirm delivery once it arrives.",
                        updated.auction.title,
                        details.carrier.trim(),
                        details.tracking_number.trim()
                    ),
                )
                .with_priority(Priority::High)
                .with_data(json!({
                    "escrowId": updated.escrow_id,
                    "trackingNumber": details.tracking_number.trim(),
                    "carrier": details.carrier.trim(),
                })),
            )
            .await;
        self.push_status(&updated, &[&updated.buyer]).await;
        Ok(updated)
    }

    /// `delivered → released`, by the buyer.
    ///
    /// Calls the settlement gateway under the escrow lock. If the gateway
    /// fails or times out, nothing local changes and the caller gets a
    /// retryable [`MarketError::SettlementFailure`].
    pub async fn confirm_delivery(
        &self,
        escrow_id: &EscrowId,
        actor: &UserId,
        confirmation: DeliveryConfirmation,
    ) -> Result<EscrowRecord, MarketError> {
        confirmation.validate()?;

        let (released, ledger) = {
            let _guard = self.locks.acquire(escrow_id).await;
            let current = self.escrow(escrow_id)?;
            current.check_release(actor)?;

            let receipt = self.settle(escrow_id).await?;
            let now = Utc::now();
            let released = match self.transition(escrow_id, |e| {
                e.release(actor, &receipt, confirmation.feedback.as_deref(), now)
            }) {
                Ok(r) => r,
                Err(e) => {
                    // Funds moved on-chain but the record did not follow.
                    error!(
                        %escrow_id,
                        tx_hash = %receipt.transaction_hash,
                        error = %e,
                        "settled escrow could not be marked released"
                    );
                    return Err(e);
                }
            };
            let ledger = ReleaseRecord::for_escrow(&released, &receipt, now);
            self.releases.insert(escrow_id.clone(), ledger.clone());
            (released, ledger)
        };
        log_transition(&released, actor, EscrowStatus::Delivered);
        self.update_seller_profile(&released.seller.user_id, confirmation.rating);

        self.dispatch
            .notify(
                Notification::new(
                    recipient(&released.seller),
                    NotificationKind::PaymentReleased,
                    "Payment released",
                    format!(
                        "{} (net of {} platform fee) for \"{}\" has been released to your wallet.",
                        ledger.net_amount, ledger.platform_fee, released.auction.title
                    ),
                )
                .with_priority(Priority::High)
                .with_email()
                .with_data(json!({
                    "escrowId": released.escrow_id,
                    "netAmount": ledger.net_amount,
                    "transactionHash": ledger.transaction_hash,
                })),
            )
            .await;
        self.dispatch
            .notify(
                Notification::new(
                    recipient(&released.buyer),
                    NotificationKind::DeliveryConfirmed,
                    "Delivery confirmed",
                    format!(
                        "You confirmed delivery of \"{}\". The escrow is complete.",
                        released.auction.title
                    ),
                )
                .with_data(escrow_data(&released)),
            )
            .await;
        self.push_status(&released, &[&released.buyer, &released.seller])
            .await;
        Ok(released)
    }

    // -- Disputes -------------------------------------------------------------

    /// Freeze the escrow and hand it to arbitration. Either party may file.
    pub async fn initiate_dispute(
        &self,
        escrow_id: &EscrowId,
        actor: &UserId,
        claim: DisputeClaim,
    ) -> Result<EscrowRecord, MarketError> {
        claim.validate()?;
        let (previous, disputed) = {
            let _guard = self.locks.acquire(escrow_id).await;
            let previous = self.escrow(escrow_id)?.status;
            let dispute_id = DisputeId::generate();
            let disputed = self.transition(escrow_id, |e| {
                e.open_dispute(actor, dispute_id, &claim, Utc::now())
            })?;
            (previous, disputed)
        };
        log_transition(&disputed, actor, previous);

        if let Some(other) = disputed.counterparty_of(actor) {
            self.dispatch
                .notify(
                    Notification::new(
                        recipient(other),
                        NotificationKind::DisputeFiled,
                        "Dispute filed",
                        format!(
                            "A dispute was filed on the escrow for \"{}\". \
                             Funds are frozen until arbitration completes.",
                            disputed.auction.title
                        ),
                    )
                    .with_priority(Priority::High)
                    .with_email()
                    .with_data(escrow_data(&disputed)),
                )
                .await;
            self.push_status(&disputed, &[other]).await;
        }
        Ok(disputed)
    }

    /// `disputed → resolved`, recorded once arbitration concludes.
    pub async fn resolve_dispute(
        &self,
        escrow_id: &EscrowId,
        arbitrator: &UserId,
        resolution: Resolution,
        notes: Option<String>,
    ) -> Result<EscrowRecord, MarketError> {
        let resolved = {
            let _guard = self.locks.acquire(escrow_id).await;
            self.transition(escrow_id, |e| {
                e.resolve(arbitrator, resolution, notes.as_deref(), Utc::now())
            })?
        };
        log_transition(&resolved, arbitrator, EscrowStatus::Disputed);

        for party in [&resolved.buyer, &resolved.seller] {
            self.dispatch
                .notify(
                    Notification::new(
                        recipient(party),
                        NotificationKind::DisputeResolved,
                        "Dispute resolved",
                        format!(
                            "The dispute on \"{}\" was resolved: {:?}.",
                            resolved.auction.title, resolution
                        ),
                    )
                    .with_priority(Priority::High)
                    .with_data(escrow_data(&resolved)),
                )
                .await;
        }
        self.push_status(&resolved, &[&resolved.buyer, &resolved.seller])
            .await;
        Ok(resolved)
    }

    // -- Reads ----------------------------------------------------------------

    /// Escrows the user is party to, filtered and paginated.
    pub fn get_user_escrows(&self, filter: &EscrowFilter, user: &UserId) -> EscrowPage {
        let (page, limit) = filter.window();
        let matching = self.escrows.filter(|e| filter.admits(e, user));
        EscrowPage::paginate(matching, page, limit)
    }

    /// One escrow, readable only by its buyer or seller.
    pub fn get_escrow_by_id(
        &self,
        escrow_id: &EscrowId,
        user: &UserId,
    ) -> Result<EscrowRecord, MarketError> {
        let escrow = self.escrow(escrow_id)?;
        if !escrow.is_party(user) {
            warn!(%escrow_id, %user, "escrow read by non-party");
            return Err(MarketError::AccessDenied {
                id: escrow_id.to_string(),
                user: user.to_string(),
            });
        }
        Ok(escrow)
    }

    /// Unrestricted lookup, for operators.
    pub fn escrow(&self, escrow_id: &EscrowId) -> Result<EscrowRecord, MarketError> {
        self.escrows
            .get(escrow_id)
            .ok_or_else(|| MarketError::not_found("escrow", escrow_id))
    }

    /// Ledger entry written when the escrow was released.
    pub fn release_record(&self, escrow_id: &EscrowId) -> Option<ReleaseRecord> {
        self.releases.get(escrow_id)
    }

    /// All ledger entries for a seller.
    pub fn releases_for_seller(&self, seller: &UserId) -> Vec<ReleaseRecord> {
        self.releases.filter(|r| r.seller_id == *seller)
    }

    // -- Internals ------------------------------------------------------------

    fn transition(
        &self,
        escrow_id: &EscrowId,
        apply: impl FnOnce(&mut EscrowRecord) -> Result<(), MarketError>,
    ) -> Result<EscrowRecord, MarketError> {
        self.escrows
            .try_update(escrow_id, |e| {
                apply(e)?;
                Ok(e.clone())
            })
            .unwrap_or_else(|| Err(MarketError::not_found("escrow", escrow_id)))
    }

    async fn settle(&self, escrow_id: &EscrowId) -> Result<SettlementReceipt, MarketError> {
        let timeout = self.config.settlement_timeout;
        match tokio::time::timeout(timeout, self.gateway.release(escrow_id)).await {
            Ok(Ok(receipt)) => {
                debug!(
                    %escrow_id,
                    gateway = self.gateway.name(),
                    tx_hash = %receipt.transaction_hash,
                    block = receipt.block_number,
                    "settlement confirmed"
                );
                Ok(receipt)
            }
            Ok(Err(e)) => {
                warn!(%escrow_id, gateway = self.gateway.name(), error = %e, "settlement failed");
                Err(MarketError::SettlementFailure {
                    escrow_id: escrow_id.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    %escrow_id,
                    gateway = self.gateway.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "settlement timed out"
                );
                Err(MarketError::SettlementFailure {
                    escrow_id: escrow_id.to_string(),
                    reason: format!("no response within {}ms", timeout.as_millis()),
                })
            }
        }
    }

    fn update_seller_profile(&self, seller: &UserId, rating: Option<u8>) {
        let outcome = self.profiles.transact(|txn| {
            let mut profile = txn
                .get(seller)
                .cloned()
                .unwrap_or_else(|| SellerProfile::new_seller(seller.clone()));
            profile.record_completed_auction();
            if let Some(rating) = rating {
                profile.record_rating(rating)?;
            }
            txn.put(seller.clone(), profile);
            Ok::<_, MarketError>(())
        });
        if let Err(e) = outcome {
            error!(%seller, error = %e, "seller profile update failed after release");
        }
    }

    async fn push_status(&self, escrow: &EscrowRecord, parties: &[&Party]) {
        for party in parties {
            self.dispatch
                .to_user(
                    &party.user_id,
                    STATUS_EVENT,
                    json!({ "escrowId": escrow.escrow_id, "status": escrow.status }),
                )
                .await;
        }
    }
}

fn recipient(party: &Party) -> Recipient {
    Recipient {
        user_id: party.user_id.clone(),
        anonymous_id: party.anonymous_id.clone(),
    }
}

fn escrow_data(escrow: &EscrowRecord) -> serde_json::Value {
    json!({
        "escrowId": escrow.escrow_id,
        "auctionId": escrow.auction.auction_id,
        "status": escrow.status,
        "amount": escrow.amount,
    })
}

fn log_transition(escrow: &EscrowRecord, actor: &UserId, from: EscrowStatus) {
    info!(
        escrow_id = %escrow.escrow_id,
        %actor,
        %from,
        to = %escrow.status,
        "escrow transition"
    );
}

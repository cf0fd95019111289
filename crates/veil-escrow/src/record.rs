//! # Escrow Record
//!
//! The canonical escrow record and its pure transitions. Every method that
//! changes `status` validates the actor and the current status first, then
//! mutates and appends exactly one timeline entry. Nothing here performs I/O;
//! the [`EscrowService`](crate::EscrowService) supplies ids, timestamps and
//! settlement receipts.
//!
//! ## Status Machine
//!
//! ```text
//! created ─► funded ─► delivered ─► released
//!    │          │           │
//!    └──────────┴───────────┴──► disputed ─► resolved
//! ```
//!
//! `confirmed` is representable but no transition produces it.
//! Terminal states: `released`, `resolved`.
//!
//! ## Sub-record Presence
//!
//! | field                         | present in                                   |
//! |-------------------------------|----------------------------------------------|
//! | `delivery`                    | `delivered`, `released`; later if shipped    |
//! | `blockchain.transaction_hash` | `released`; `funded` when funding had proof  |
//! | `dispute`                     | `disputed`, `resolved`                       |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::{AnonymousId, AuctionId, DisputeId, EscrowId, MarketError, UserId};
use veil_settlement::SettlementReceipt;

const ENTITY: &str = "escrow";

// ── Escrow Status ──────────────────────────────────────────────────────

/// Lifecycle status of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Created,
    Funded,
    Delivered,
    /// Reserved. No transition produces it.
    Confirmed,
    Released,
    Disputed,
    Resolved,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Funded => "funded",
            Self::Delivered => "delivered",
            Self::Confirmed => "confirmed",
            Self::Released => "released",
            Self::Disputed => "disputed",
            Self::Resolved => "resolved",
        }
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Resolved)
    }

    /// The transition relation of the status machine.
    pub fn can_transition_to(&self, next: EscrowStatus) -> bool {
        use EscrowStatus::*;
        match (*self, next) {
            (Created, Funded) | (Funded, Delivered) | (Delivered, Released) => true,
            (Disputed, Resolved) => true,
            (from, Disputed) => !from.is_terminal() && from != Disputed,
            _ => false,
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EscrowStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "funded" => Ok(Self::Funded),
            "delivered" => Ok(Self::Delivered),
            "confirmed" => Ok(Self::Confirmed),
            "released" => Ok(Self::Released),
            "disputed" => Ok(Self::Disputed),
            "resolved" => Ok(Self::Resolved),
            other => Err(MarketError::validation(format!(
                "unknown escrow status {other:?}"
            ))),
        }
    }
}

// ── Sub-records ────────────────────────────────────────────────────────

/// One side of the trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub user_id: UserId,
    pub anonymous_id: AnonymousId,
    pub wallet_address: String,
}

/// The auction an escrow settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRef {
    pub auction_id: AuctionId,
    pub title: String,
}

/// On-chain state of the escrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    pub is_on_chain: bool,
}

/// Shipment details recorded by the seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub tracking_number: String,
    pub carrier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Outcome of arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    RefundBuyer,
    ReleaseToSeller,
    Split,
}

/// An open or resolved dispute.
///
/// `is_disputed` stays `true` after resolution; the sub-record is absent
/// on escrows that were never disputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRecord {
    pub is_disputed: bool,
    pub dispute_id: DisputeId,
    pub filed_by: UserId,
    pub reason: String,
    pub filed_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fees fixed at escrow creation, in whole currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    pub platform_fee: u64,
    pub arbitration_fee: u64,
}

impl Fees {
    /// Fees for `amount` at the given basis-point rates, rounded down.
    pub fn for_amount(amount: u64, platform_fee_bps: u32, arbitration_fee_bps: u32) -> Self {
        Self {
            platform_fee: bps_of(amount, platform_fee_bps),
            arbitration_fee: bps_of(amount, arbitration_fee_bps),
        }
    }
}

fn bps_of(amount: u64, bps: u32) -> u64 {
    let fee = u128::from(amount) * u128::from(bps) / 10_000;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// One audit entry. Appended on every status change, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: EscrowStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_by: UserId,
}

// ── Transition Inputs ──────────────────────────────────────────────────

/// Everything needed to open an escrow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEscrow {
    pub auction: AuctionRef,
    pub buyer: Party,
    pub seller: Party,
    pub amount: u64,
    #[serde(default)]
    pub contract_address: Option<String>,
}

impl NewEscrow {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.buyer.user_id == self.seller.user_id {
            return Err(MarketError::validation("buyer and seller must differ"));
        }
        if self.auction.title.trim().is_empty() {
            return Err(MarketError::validation("auction title must not be empty"));
        }
        if self.buyer.wallet_address.trim().is_empty()
            || self.seller.wallet_address.trim().is_empty()
        {
            return Err(MarketError::validation("both parties need a wallet address"));
        }
        Ok(())
    }
}

/// On-chain evidence of funding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundingProof {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub tracking_number: String,
    pub carrier: String,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DeliveryDetails {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.tracking_number.trim().is_empty() {
            return Err(MarketError::validation("tracking number must not be empty"));
        }
        if self.carrier.trim().is_empty() {
            return Err(MarketError::validation("carrier must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfirmation {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl DeliveryConfirmation {
    pub fn validate(&self) -> Result<(), MarketError> {
        match self.rating {
            Some(r) if !(1..=5).contains(&r) => {
                Err(MarketError::validation("rating must be between 1 and 5"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisputeClaim {
    pub reason: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub requested_resolution: Option<Resolution>,
}

impl DisputeClaim {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.reason.trim().is_empty() {
            return Err(MarketError::validation("dispute reason must not be empty"));
        }
        Ok(())
    }
}

// ── Escrow Record ──────────────────────────────────────────────────────

/// Custody state of the funds for one auction.
///
/// `amount` and `fees` are fixed at creation. Afterwards only `status`,
/// `delivery`, `dispute`, `blockchain` and the timeline change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscrowRecord {
    pub escrow_id: EscrowId,
    pub auction: AuctionRef,
    pub buyer: Party,
    pub seller: Party,
    pub amount: u64,
    pub status: EscrowStatus,
    pub blockchain: BlockchainRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute: Option<DisputeRecord>,
    pub fees: Fees,
    pub timeline: Vec<TimelineEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscrowRecord {
    /// Open a new escrow in `created` with its initial timeline entry.
    pub fn open(
        escrow_id: EscrowId,
        new: NewEscrow,
        fees: Fees,
        created_by: &UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            escrow_id,
            auction: new.auction,
            buyer: new.buyer,
            seller: new.seller,
            amount: new.amount,
            status: EscrowStatus::Created,
            blockchain: BlockchainRecord {
                contract_address: new.contract_address,
                ..BlockchainRecord::default()
            },
            delivery: None,
            dispute: None,
            fees,
            timeline: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        record.push_timeline(EscrowStatus::Created, Some("Escrow created"), created_by, now);
        record
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        self.buyer.user_id == *user || self.seller.user_id == *user
    }

    pub fn is_disputed(&self) -> bool {
        self.dispute.as_ref().is_some_and(|d| d.is_disputed)
    }

    /// The party opposite `user`, if `user` is a party at all.
    pub fn counterparty_of(&self, user: &UserId) -> Option<&Party> {
        if self.buyer.user_id == *user {
            Some(&self.seller)
        } else if self.seller.user_id == *user {
            Some(&self.buyer)
        } else {
            None
        }
    }

    /// `created → funded`.
    pub fn fund(
        &mut self,
        proof: &FundingProof,
        actor: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.ensure_transition("record_funding", EscrowStatus::Funded)?;
        if let Some(addr) = &proof.contract_address {
            self.blockchain.contract_address = Some(addr.clone());
        }
        if let Some(hash) = &proof.transaction_hash {
            self.blockchain.transaction_hash = Some(hash.clone());
            self.blockchain.block_number = proof.block_number;
            self.blockchain.is_on_chain = true;
        }
        self.push_timeline(EscrowStatus::Funded, Some("Payment received"), actor, now);
        Ok(())
    }

    /// `funded → delivered`, seller only.
    pub fn mark_delivered(
        &mut self,
        actor: &UserId,
        details: &DeliveryDetails,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if self.seller.user_id != *actor {
            return Err(MarketError::forbidden(
                ENTITY,
                &self.escrow_id,
                actor,
                "mark_delivered",
            ));
        }
        self.ensure_transition("mark_delivered", EscrowStatus::Delivered)?;
        self.delivery = Some(DeliveryRecord {
            tracking_number: details.tracking_number.trim().to_string(),
            carrier: details.carrier.trim().to_string(),
            estimated_delivery: details.estimated_delivery,
            delivered_at: now,
            confirmed_at: None,
            confirmed_by: None,
            feedback: None,
        });
        let notes = details
            .notes
            .clone()
            .unwrap_or_else(|| format!("Shipped via {}", details.carrier.trim()));
        self.push_timeline(EscrowStatus::Delivered, Some(&notes), actor, now);
        Ok(())
    }

    /// Check that `actor` may release this escrow now, without mutating.
    pub fn check_release(&self, actor: &UserId) -> Result<(), MarketError> {
        if self.buyer.user_id != *actor {
            return Err(MarketError::forbidden(
                ENTITY,
                &self.escrow_id,
                actor,
                "confirm_delivery",
            ));
        }
        self.ensure_transition("confirm_delivery", EscrowStatus::Released)
    }

    /// `delivered → released`, applying the settlement receipt.
    pub fn release(
        &mut self,
        actor: &UserId,
        receipt: &SettlementReceipt,
        feedback: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.check_release(actor)?;
        self.blockchain.transaction_hash = Some(receipt.transaction_hash.clone());
        self.blockchain.block_number = Some(receipt.block_number);
        self.blockchain.gas_used = Some(receipt.gas_used);
        self.blockchain.is_on_chain = true;
        if let Some(delivery) = self.delivery.as_mut() {
            delivery.confirmed_at = Some(now);
            delivery.confirmed_by = Some(actor.clone());
            delivery.feedback = feedback.map(str::to_string);
        }
        self.push_timeline(
            EscrowStatus::Released,
            Some("Delivery confirmed, funds released"),
            actor,
            now,
        );
        Ok(())
    }

    /// Any non-terminal status `→ disputed`, by either party.
    pub fn open_dispute(
        &mut self,
        actor: &UserId,
        dispute_id: DisputeId,
        claim: &DisputeClaim,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if !self.is_party(actor) {
            return Err(MarketError::forbidden(
                ENTITY,
                &self.escrow_id,
                actor,
                "initiate_dispute",
            ));
        }
        if self.is_disputed() {
            return Err(MarketError::AlreadyDisputed {
                escrow_id: self.escrow_id.to_string(),
            });
        }
        self.ensure_transition("initiate_dispute", EscrowStatus::Disputed)?;
        let reason = claim.reason.trim().to_string();
        self.dispute = Some(DisputeRecord {
            is_disputed: true,
            dispute_id,
            filed_by: actor.clone(),
            reason: reason.clone(),
            filed_at: now,
            evidence: claim.evidence.clone(),
            requested_resolution: claim.requested_resolution,
            resolution: None,
            resolved_at: None,
            resolved_by: None,
            notes: None,
        });
        self.push_timeline(
            EscrowStatus::Disputed,
            Some(&format!("Dispute filed: {reason}")),
            actor,
            now,
        );
        Ok(())
    }

    /// `disputed → resolved`, applied by arbitration.
    pub fn resolve(
        &mut self,
        arbitrator: &UserId,
        resolution: Resolution,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.ensure_transition("resolve_dispute", EscrowStatus::Resolved)?;
        let Some(dispute) = self.dispute.as_mut() else {
            return Err(MarketError::invalid_state(
                ENTITY,
                &self.escrow_id,
                "resolve_dispute",
                self.status,
            ));
        };
        dispute.resolution = Some(resolution);
        dispute.resolved_at = Some(now);
        dispute.resolved_by = Some(arbitrator.clone());
        dispute.notes = notes.map(str::to_string);
        self.push_timeline(EscrowStatus::Resolved, notes, arbitrator, now);
        Ok(())
    }

    fn ensure_transition(
        &self,
        operation: &'static str,
        next: EscrowStatus,
    ) -> Result<(), MarketError> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::invalid_state(
                ENTITY,
                &self.escrow_id,
                operation,
                self.status,
            ));
        }
        Ok(())
    }

    fn push_timeline(
        &mut self,
        status: EscrowStatus,
        notes: Option<&str>,
        actor: &UserId,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.updated_at = now;
        self.timeline.push(TimelineEntry {
            status,
            timestamp: now,
            notes: notes.map(str::to_string),
            updated_by: actor.clone(),
        });
    }
}

// ── Release Ledger ─────────────────────────────────────────────────────

/// Funds-release ledger entry for the seller, one per released escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub escrow_id: EscrowId,
    pub seller_id: UserId,
    pub amount: u64,
    pub platform_fee: u64,
    pub net_amount: u64,
    pub transaction_hash: String,
    pub released_at: DateTime<Utc>,
}

impl ReleaseRecord {
    pub fn for_escrow(
        escrow: &EscrowRecord,
        receipt: &SettlementReceipt,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            escrow_id: escrow.escrow_id.clone(),
            seller_id: escrow.seller.user_id.clone(),
            amount: escrow.amount,
            platform_fee: escrow.fees.platform_fee,
            net_amount: escrow.amount.saturating_sub(escrow.fees.platform_fee),
            transaction_hash: receipt.transaction_hash.clone(),
            released_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::ErrorKind;

    fn party(name: &str) -> Party {
        Party {
            user_id: UserId::new(name),
            anonymous_id: AnonymousId::new(format!("anon-{name}")),
            wallet_address: format!("0x{name}"),
        }
    }

    fn new_escrow() -> NewEscrow {
        NewEscrow {
            auction: AuctionRef {
                auction_id: AuctionId::new("AUC-00000001"),
                title: "Camera".into(),
            },
            buyer: party("buyer"),
            seller: party("seller"),
            amount: 500,
            contract_address: None,
        }
    }

    fn escrow_in(status: EscrowStatus) -> EscrowRecord {
        let now = Utc::now();
        let system = UserId::new("system");
        let mut e = EscrowRecord::open(
            EscrowId::new("ESC-00000001"),
            new_escrow(),
            Fees::for_amount(500, 250, 0),
            &system,
            now,
        );
        if status == EscrowStatus::Created {
            return e;
        }
        e.fund(&FundingProof::default(), &system, now).unwrap();
        if status == EscrowStatus::Funded {
            return e;
        }
        e.mark_delivered(&UserId::new("seller"), &details(), now).unwrap();
        e
    }

    fn details() -> DeliveryDetails {
        DeliveryDetails {
            tracking_number: "1Z999".into(),
            carrier: "UPS".into(),
            estimated_delivery: None,
            notes: None,
        }
    }

    fn receipt() -> SettlementReceipt {
        SettlementReceipt {
            transaction_hash: "0xabc".into(),
            block_number: 100,
            gas_used: 21_000,
        }
    }

    fn claim() -> DisputeClaim {
        DisputeClaim {
            reason: "Item not as described".into(),
            evidence: vec!["photo-1".into()],
            requested_resolution: Some(Resolution::RefundBuyer),
        }
    }

    #[test]
    fn open_appends_created_entry() {
        let e = escrow_in(EscrowStatus::Created);
        assert_eq!(e.timeline.len(), 1);
        assert_eq!(e.timeline[0].status, EscrowStatus::Created);
        assert_eq!(e.fees.platform_fee, 12);
    }

    #[test]
    fn transition_relation() {
        use EscrowStatus::*;
        assert!(Created.can_transition_to(Funded));
        assert!(!Created.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Released));
        assert!(Funded.can_transition_to(Disputed));
        assert!(!Released.can_transition_to(Disputed));
        assert!(!Disputed.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Disputed));
        for s in [Created, Funded, Delivered, Confirmed, Released, Disputed, Resolved] {
            assert!(!s.can_transition_to(Confirmed));
        }
    }

    #[test]
    fn mark_delivered_by_seller() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let before = e.timeline.len();
        e.mark_delivered(&UserId::new("seller"), &details(), Utc::now()).unwrap();
        assert_eq!(e.status, EscrowStatus::Delivered);
        assert_eq!(e.delivery.as_ref().unwrap().tracking_number, "1Z999");
        assert_eq!(e.timeline.len(), before + 1);
    }

    #[test]
    fn mark_delivered_by_buyer_is_forbidden() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let err = e
            .mark_delivered(&UserId::new("buyer"), &details(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(e.status, EscrowStatus::Funded);
    }

    #[test]
    fn mark_delivered_before_funding_is_invalid_state() {
        let mut e = escrow_in(EscrowStatus::Created);
        let err = e
            .mark_delivered(&UserId::new("seller"), &details(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn release_populates_blockchain_and_delivery() {
        let mut e = escrow_in(EscrowStatus::Delivered);
        e.release(&UserId::new("buyer"), &receipt(), Some("great"), Utc::now())
            .unwrap();
        assert_eq!(e.status, EscrowStatus::Released);
        assert_eq!(e.blockchain.transaction_hash.as_deref(), Some("0xabc"));
        assert_eq!(e.blockchain.block_number, Some(100));
        assert!(e.blockchain.is_on_chain);
        let d = e.delivery.as_ref().unwrap();
        assert_eq!(d.confirmed_by, Some(UserId::new("buyer")));
        assert_eq!(d.feedback.as_deref(), Some("great"));
    }

    #[test]
    fn release_twice_is_invalid_state() {
        let mut e = escrow_in(EscrowStatus::Delivered);
        e.release(&UserId::new("buyer"), &receipt(), None, Utc::now()).unwrap();
        let err = e
            .release(&UserId::new("buyer"), &receipt(), None, Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn dispute_freezes_delivery_and_release() {
        let mut e = escrow_in(EscrowStatus::Funded);
        e.open_dispute(&UserId::new("buyer"), DisputeId::new("DSP-00000001"), &claim(), Utc::now())
            .unwrap();
        assert!(e.is_disputed());
        let err = e
            .mark_delivered(&UserId::new("seller"), &details(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            e.check_release(&UserId::new("buyer")).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn second_dispute_is_already_disputed() {
        let mut e = escrow_in(EscrowStatus::Delivered);
        let now = Utc::now();
        e.open_dispute(&UserId::new("seller"), DisputeId::new("DSP-00000001"), &claim(), now)
            .unwrap();
        let err = e
            .open_dispute(&UserId::new("buyer"), DisputeId::new("DSP-00000002"), &claim(), now)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyDisputed);
    }

    #[test]
    fn outsider_cannot_dispute() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let err = e
            .open_dispute(
                &UserId::new("mallory"),
                DisputeId::new("DSP-00000001"),
                &claim(),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn released_escrow_cannot_be_disputed() {
        let mut e = escrow_in(EscrowStatus::Delivered);
        e.release(&UserId::new("buyer"), &receipt(), None, Utc::now()).unwrap();
        let err = e
            .open_dispute(
                &UserId::new("buyer"),
                DisputeId::new("DSP-00000001"),
                &claim(),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn resolve_closes_dispute() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let now = Utc::now();
        e.open_dispute(&UserId::new("buyer"), DisputeId::new("DSP-00000001"), &claim(), now)
            .unwrap();
        e.resolve(&UserId::new("arbiter"), Resolution::Split, Some("half each"), now)
            .unwrap();
        assert_eq!(e.status, EscrowStatus::Resolved);
        let d = e.dispute.as_ref().unwrap();
        assert_eq!(d.resolution, Some(Resolution::Split));
        assert_eq!(d.resolved_by, Some(UserId::new("arbiter")));
        assert!(e.status.is_terminal());
    }

    #[test]
    fn dispute_serializes_is_disputed_flag() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let before = serde_json::to_value(&e).unwrap();
        assert!(before.get("dispute").is_none());

        let now = Utc::now();
        e.open_dispute(&UserId::new("buyer"), DisputeId::new("DSP-00000001"), &claim(), now)
            .unwrap();
        let open = serde_json::to_value(&e).unwrap();
        assert_eq!(open["dispute"]["isDisputed"], true);
        assert_eq!(open["dispute"]["disputeId"], "DSP-00000001");

        e.resolve(&UserId::new("arbiter"), Resolution::RefundBuyer, None, now)
            .unwrap();
        let resolved = serde_json::to_value(&e).unwrap();
        assert_eq!(resolved["dispute"]["isDisputed"], true);
        assert_eq!(resolved["dispute"]["resolution"], "refund_buyer");

        let back: EscrowRecord = serde_json::from_value(resolved).unwrap();
        assert!(back.is_disputed());
    }

    #[test]
    fn resolve_without_dispute_is_invalid_state() {
        let mut e = escrow_in(EscrowStatus::Funded);
        let err = e
            .resolve(&UserId::new("arbiter"), Resolution::RefundBuyer, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn funding_proof_marks_on_chain() {
        let mut e = escrow_in(EscrowStatus::Created);
        let proof = FundingProof {
            transaction_hash: Some("0xfund".into()),
            block_number: Some(7),
            contract_address: Some("0xcontract".into()),
        };
        e.fund(&proof, &UserId::new("watcher"), Utc::now()).unwrap();
        assert!(e.blockchain.is_on_chain);
        assert_eq!(e.blockchain.contract_address.as_deref(), Some("0xcontract"));
    }

    #[test]
    fn fee_rounding_and_large_amounts() {
        assert_eq!(Fees::for_amount(399, 250, 0).platform_fee, 9);
        assert_eq!(Fees::for_amount(u64::MAX, 10_000, 0).platform_fee, u64::MAX);
    }

    #[test]
    fn status_round_trips_through_str() {
        let names = [
            "created",
            "funded",
            "delivered",
            "confirmed",
            "released",
            "disputed",
            "resolved",
        ];
        for s in names {
            let parsed: EscrowStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("shipped".parse::<EscrowStatus>().is_err());
    }

    #[test]
    fn validation_helpers() {
        assert!(DeliveryConfirmation { rating: Some(6), feedback: None }.validate().is_err());
        assert!(DeliveryConfirmation { rating: Some(5), feedback: None }.validate().is_ok());
        assert!(DisputeClaim { reason: "  ".into(), evidence: vec![], requested_resolution: None }
            .validate()
            .is_err());
        let mut n = new_escrow();
        n.seller = n.buyer.clone();
        assert!(n.validate().is_err());
    }
}

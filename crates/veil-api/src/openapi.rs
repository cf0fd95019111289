//! # OpenAPI Document
//!
//! Collects the utoipa-annotated `/v1` handlers into one OpenAPI 3 document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "VeilBid API",
        version = "0.1.0",
        description = "Auction intake, moderation and escrow lifecycle for VeilBid.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Auctions
        crate::routes::auctions::submit_auction,
        // Moderation
        crate::routes::approvals::pending_approvals,
        crate::routes::approvals::approval_queue,
        crate::routes::approvals::approval_stats,
        crate::routes::approvals::approve_auction,
        crate::routes::approvals::reject_auction,
        crate::routes::approvals::bulk_approve,
        crate::routes::approvals::auto_approve,
        // Escrows
        crate::routes::escrows::list_escrows,
        crate::routes::escrows::get_escrow,
        crate::routes::escrows::mark_delivered,
        crate::routes::escrows::confirm_delivery,
        crate::routes::escrows::initiate_dispute,
        crate::routes::escrows::create_escrow,
        crate::routes::escrows::record_funding,
        crate::routes::escrows::resolve_dispute,
        // Notifications
        crate::routes::notifications::list_notifications,
        // Operations
        crate::routes::metrics::read_metrics,
    ),
    components(schemas(
        // Identifiers
        veil_core::UserId,
        veil_core::AnonymousId,
        veil_core::AuctionId,
        veil_core::EscrowId,
        veil_core::DisputeId,
        // Auctions
        veil_core::AuctionRecord,
        veil_core::AuctionStatus,
        veil_core::AuctionType,
        veil_core::Pricing,
        veil_core::Moderation,
        crate::routes::auctions::SubmitAuctionRequest,
        crate::routes::auctions::PricingRequest,
        // Moderation
        veil_risk::RiskAssessment,
        veil_risk::RiskLevel,
        veil_risk::RiskSummary,
        veil_approval::PendingItem,
        veil_approval::PendingPage,
        veil_approval::QueueItem,
        veil_approval::ApprovalQueue,
        veil_approval::ApprovalStats,
        veil_approval::Outcomes,
        veil_approval::StatsPeriod,
        veil_approval::stats::DayOutcomes,
        veil_approval::stats::CategoryOutcomes,
        veil_approval::stats::ModeratorOutcomes,
        veil_approval::BulkApproval,
        veil_approval::AutoApproval,
        crate::routes::approvals::ApproveRequest,
        crate::routes::approvals::RejectRequest,
        crate::routes::approvals::BulkApproveRequest,
        crate::routes::approvals::AutoApproveRequest,
        // Escrows
        veil_escrow::EscrowRecord,
        veil_escrow::EscrowStatus,
        veil_escrow::EscrowPage,
        veil_escrow::PartyRole,
        veil_escrow::Party,
        veil_escrow::AuctionRef,
        veil_escrow::BlockchainRecord,
        veil_escrow::DeliveryRecord,
        veil_escrow::DisputeRecord,
        veil_escrow::Resolution,
        veil_escrow::Fees,
        veil_escrow::TimelineEntry,
        veil_escrow::NewEscrow,
        veil_escrow::FundingProof,
        veil_escrow::DeliveryDetails,
        veil_escrow::DeliveryConfirmation,
        veil_escrow::DisputeClaim,
        crate::routes::escrows::ResolveRequest,
        // Notifications
        veil_notify::Notification,
        veil_notify::NotificationKind,
        veil_notify::Priority,
        veil_notify::Channels,
        veil_notify::Recipient,
        crate::routes::notifications::InboxResponse,
        // Operations
        crate::middleware::metrics::MetricsSnapshot,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "auctions", description = "Listing intake"),
        (name = "approvals", description = "Moderation console"),
        (name = "escrows", description = "Escrow lifecycle"),
        (name = "notifications", description = "In-app inbox"),
        (name = "operations", description = "Request counters"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//! # Moderation Console
//!
//! Admin-only views of the review backlog and the approve/reject actions.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use veil_approval::{
    ApprovalQueue, ApprovalStats, AutoApproval, BulkApproval, PendingFilter, PendingPage,
    StatsPeriod,
};
use veil_core::{AuctionId, AuctionRecord, MarketError};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_optional_json, extract_query, extract_validated_json, Validate,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: StatsPeriod,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApproveRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkApproveRequest {
    pub auction_ids: Vec<AuctionId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for BulkApproveRequest {
    fn validate(&self) -> Result<(), MarketError> {
        if self.auction_ids.is_empty() {
            return Err(MarketError::validation("auctionIds must not be empty"));
        }
        Ok(())
    }
}

/// Sweep options. Without a body the sweep is a dry run.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoApproveRequest {
    #[serde(default = "dry_run_default")]
    pub dry_run: bool,
}

fn dry_run_default() -> bool {
    true
}

impl Default for AutoApproveRequest {
    fn default() -> Self {
        Self {
            dry_run: dry_run_default(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/approvals/pending", get(pending_approvals))
        .route("/v1/admin/approvals/queue", get(approval_queue))
        .route("/v1/admin/approvals/stats", get(approval_stats))
        .route("/v1/admin/auctions/bulk-approve", post(bulk_approve))
        .route("/v1/admin/auctions/auto-approve", post(auto_approve))
        .route("/v1/admin/auctions/:id/approve", post(approve_auction))
        .route("/v1/admin/auctions/:id/reject", post(reject_auction))
}

/// GET /v1/admin/approvals/pending
#[utoipa::path(
    get,
    path = "/v1/admin/approvals/pending",
    params(
        ("category" = Option<String>, Query, description = "Category filter"),
        ("riskLevel" = Option<veil_risk::RiskLevel>, Query, description = "Risk level filter"),
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100"),
    ),
    responses(
        (status = 200, description = "Pending auctions, oldest first", body = PendingPage),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn pending_approvals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<PendingFilter>, QueryRejection>,
) -> Result<Json<PendingPage>, AppError> {
    require_role(&caller, Role::Admin)?;
    let filter = extract_query(query)?;
    Ok(Json(state.moderation.get_pending_approvals(&filter)))
}

/// GET /v1/admin/approvals/queue
#[utoipa::path(
    get,
    path = "/v1/admin/approvals/queue",
    responses(
        (status = 200, description = "Pending auctions by priority", body = ApprovalQueue),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn approval_queue(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ApprovalQueue>, AppError> {
    require_role(&caller, Role::Admin)?;
    Ok(Json(state.moderation.get_approval_queue()))
}

/// GET /v1/admin/approvals/stats?period=24h|7d|30d
#[utoipa::path(
    get,
    path = "/v1/admin/approvals/stats",
    params(("period" = Option<veil_approval::StatsPeriod>, Query, description = "24h, 7d or 30d")),
    responses(
        (status = 200, description = "Decision statistics", body = ApprovalStats),
        (status = 400, description = "Unknown period", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn approval_stats(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<ApprovalStats>, AppError> {
    require_role(&caller, Role::Admin)?;
    let query = extract_query(query)?;
    Ok(Json(state.moderation.approval_stats(query.period)))
}

/// POST /v1/admin/auctions/:id/approve
#[utoipa::path(
    post,
    path = "/v1/admin/auctions/{id}/approve",
    params(("id" = String, Path, description = "Auction id")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Auction approved", body = AuctionRecord),
        (status = 404, description = "Auction not found", body = crate::error::ErrorBody),
        (status = 409, description = "Auction is not pending", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn approve_auction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<Json<AuctionRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req: ApproveRequest = extract_optional_json(body)?;
    let record = state
        .moderation
        .approve_auction(&AuctionId::new(id), &caller.user_id, req.notes.as_deref())
        .await?;
    Ok(Json(record))
}

/// POST /v1/admin/auctions/:id/reject
#[utoipa::path(
    post,
    path = "/v1/admin/auctions/{id}/reject",
    params(("id" = String, Path, description = "Auction id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Auction rejected", body = AuctionRecord),
        (status = 409, description = "Auction is not pending", body = crate::error::ErrorBody),
        (status = 422, description = "Reason too short", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn reject_auction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<Json<AuctionRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_json(body)?;
    let record = state
        .moderation
        .reject_auction(&AuctionId::new(id), &caller.user_id, &req.reason)
        .await?;
    Ok(Json(record))
}

/// POST /v1/admin/auctions/bulk-approve
#[utoipa::path(
    post,
    path = "/v1/admin/auctions/bulk-approve",
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Batch committed", body = BulkApproval),
        (status = 422, description = "Empty or oversized id list", body = crate::error::ErrorBody),
        (status = 500, description = "Batch rolled back", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn bulk_approve(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<BulkApproveRequest>, JsonRejection>,
) -> Result<Json<BulkApproval>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let outcome = state
        .moderation
        .bulk_approve(&req.auction_ids, &caller.user_id, req.notes.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// POST /v1/admin/auctions/auto-approve
#[utoipa::path(
    post,
    path = "/v1/admin/auctions/auto-approve",
    request_body = AutoApproveRequest,
    responses(
        (status = 200, description = "Sweep outcome", body = AutoApproval),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    tag = "approvals"
)]
async fn auto_approve(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AutoApproveRequest>, JsonRejection>,
) -> Result<Json<AutoApproval>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req: AutoApproveRequest = extract_optional_json(body)?;
    let outcome = state
        .moderation
        .auto_approve_low_risk(req.dry_run, &caller.user_id)
        .await?;
    Ok(Json(outcome))
}

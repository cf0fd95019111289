//! # Escrow Routes
//!
//! Party-facing reads and transitions under `/v1/escrows`, plus the admin
//! hand-offs under `/v1/admin/escrows`: creation when an auction closes,
//! funding when the deposit lands, and resolution once arbitration ends.
//!
//! The engine enforces who may do what; handlers only pass the caller
//! through. Reads by a non-party come back as 403 `ACCESS_DENIED`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use veil_core::{EscrowId, MarketError};
use veil_escrow::{
    DeliveryConfirmation, DeliveryDetails, DisputeClaim, EscrowFilter, EscrowPage, EscrowRecord,
    FundingProof, NewEscrow, Resolution,
};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_optional_json, extract_query, extract_validated_json, Validate,
};
use crate::state::AppState;

impl Validate for NewEscrow {
    fn validate(&self) -> Result<(), MarketError> {
        NewEscrow::validate(self)
    }
}

impl Validate for DeliveryDetails {
    fn validate(&self) -> Result<(), MarketError> {
        DeliveryDetails::validate(self)
    }
}

impl Validate for DisputeClaim {
    fn validate(&self) -> Result<(), MarketError> {
        DisputeClaim::validate(self)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveRequest {
    pub resolution: Resolution,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/escrows", get(list_escrows))
        .route("/v1/escrows/:id", get(get_escrow))
        .route("/v1/escrows/:id/deliver", post(mark_delivered))
        .route("/v1/escrows/:id/confirm", post(confirm_delivery))
        .route("/v1/escrows/:id/dispute", post(initiate_dispute))
        .route("/v1/admin/escrows", post(create_escrow))
        .route("/v1/admin/escrows/:id/fund", post(record_funding))
        .route("/v1/admin/escrows/:id/resolve", post(resolve_dispute))
}

// -- Party routes -------------------------------------------------------------

/// GET /v1/escrows?role=buyer|seller|any&status=&page=&limit=
#[utoipa::path(
    get,
    path = "/v1/escrows",
    params(
        ("role" = Option<veil_escrow::PartyRole>, Query, description = "buyer, seller or any"),
        ("status" = Option<veil_escrow::EscrowStatus>, Query, description = "Status filter"),
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100"),
    ),
    responses(
        (status = 200, description = "Caller's escrows, newest first", body = EscrowPage),
    ),
    tag = "escrows"
)]
async fn list_escrows(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<EscrowFilter>, QueryRejection>,
) -> Result<Json<EscrowPage>, AppError> {
    let filter = extract_query(query)?;
    Ok(Json(state.escrow.get_user_escrows(&filter, &caller.user_id)))
}

/// GET /v1/escrows/:id
#[utoipa::path(
    get,
    path = "/v1/escrows/{id}",
    params(("id" = String, Path, description = "Escrow id")),
    responses(
        (status = 200, description = "Escrow found", body = EscrowRecord),
        (status = 403, description = "Caller is not a party", body = crate::error::ErrorBody),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn get_escrow(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<EscrowRecord>, AppError> {
    let record = state
        .escrow
        .get_escrow_by_id(&EscrowId::new(id), &caller.user_id)?;
    Ok(Json(record))
}

/// POST /v1/escrows/:id/deliver
#[utoipa::path(
    post,
    path = "/v1/escrows/{id}/deliver",
    params(("id" = String, Path, description = "Escrow id")),
    request_body = DeliveryDetails,
    responses(
        (status = 200, description = "Shipment recorded", body = EscrowRecord),
        (status = 403, description = "Caller is not the seller", body = crate::error::ErrorBody),
        (status = 409, description = "Escrow is not funded", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn mark_delivered(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<DeliveryDetails>, JsonRejection>,
) -> Result<Json<EscrowRecord>, AppError> {
    let details = extract_validated_json(body)?;
    let record = state
        .escrow
        .mark_delivered(&EscrowId::new(id), &caller.user_id, details)
        .await?;
    Ok(Json(record))
}

/// POST /v1/escrows/:id/confirm
///
/// 502 with `retryable: true` when settlement fails; the escrow stays
/// `delivered` and the call can be repeated.
#[utoipa::path(
    post,
    path = "/v1/escrows/{id}/confirm",
    params(("id" = String, Path, description = "Escrow id")),
    request_body = DeliveryConfirmation,
    responses(
        (status = 200, description = "Funds released", body = EscrowRecord),
        (status = 409, description = "Escrow is not delivered", body = crate::error::ErrorBody),
        (status = 502, description = "Settlement failed", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn confirm_delivery(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<DeliveryConfirmation>, JsonRejection>,
) -> Result<Json<EscrowRecord>, AppError> {
    let confirmation: DeliveryConfirmation = extract_optional_json(body)?;
    let record = state
        .escrow
        .confirm_delivery(&EscrowId::new(id), &caller.user_id, confirmation)
        .await?;
    Ok(Json(record))
}

/// POST /v1/escrows/:id/dispute
#[utoipa::path(
    post,
    path = "/v1/escrows/{id}/dispute",
    params(("id" = String, Path, description = "Escrow id")),
    request_body = DisputeClaim,
    responses(
        (status = 200, description = "Dispute opened", body = EscrowRecord),
        (status = 409, description = "Already disputed or settled", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn initiate_dispute(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<DisputeClaim>, JsonRejection>,
) -> Result<Json<EscrowRecord>, AppError> {
    let claim = extract_validated_json(body)?;
    let record = state
        .escrow
        .initiate_dispute(&EscrowId::new(id), &caller.user_id, claim)
        .await?;
    Ok(Json(record))
}

// -- Admin routes -------------------------------------------------------------

/// POST /v1/admin/escrows
#[utoipa::path(
    post,
    path = "/v1/admin/escrows",
    request_body = NewEscrow,
    responses(
        (status = 201, description = "Escrow created", body = EscrowRecord),
        (status = 422, description = "Invalid escrow", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn create_escrow(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<NewEscrow>, JsonRejection>,
) -> Result<(StatusCode, Json<EscrowRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let new = extract_validated_json(body)?;
    let record = state.escrow.create_escrow(new, &caller.user_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /v1/admin/escrows/:id/fund
#[utoipa::path(
    post,
    path = "/v1/admin/escrows/{id}/fund",
    params(("id" = String, Path, description = "Escrow id")),
    request_body = FundingProof,
    responses(
        (status = 200, description = "Funding recorded", body = EscrowRecord),
        (status = 409, description = "Escrow is not created", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn record_funding(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<FundingProof>, JsonRejection>,
) -> Result<Json<EscrowRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let proof: FundingProof = extract_optional_json(body)?;
    let record = state
        .escrow
        .record_funding(&EscrowId::new(id), proof, &caller.user_id)
        .await?;
    Ok(Json(record))
}

/// POST /v1/admin/escrows/:id/resolve
#[utoipa::path(
    post,
    path = "/v1/admin/escrows/{id}/resolve",
    params(("id" = String, Path, description = "Escrow id")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Dispute resolved", body = EscrowRecord),
        (status = 409, description = "Escrow is not disputed", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
async fn resolve_dispute(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<EscrowRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_json(body)?;
    let record = state
        .escrow
        .resolve_dispute(&EscrowId::new(id), &caller.user_id, req.resolution, req.notes)
        .await?;
    Ok(Json(record))
}

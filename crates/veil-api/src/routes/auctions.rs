//! # Auction Intake
//!
//! Sellers submit listings here. Every submission lands in the moderation
//! queue as `pending`; the seller is always the authenticated caller.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use veil_core::{AnonymousId, AuctionRecord, AuctionType, MarketError, NewAuction, Pricing};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAuctionRequest {
    pub seller_anonymous_id: AnonymousId,
    pub title: String,
    pub category: String,
    #[serde(rename = "type")]
    pub auction_type: AuctionType,
    pub pricing: PricingRequest,
}

/// Opening prices. The current bid starts at the starting bid.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    pub starting_bid: u64,
    #[serde(default)]
    pub reserve_price: Option<u64>,
    #[serde(default)]
    pub buy_now_price: Option<u64>,
}

impl Validate for SubmitAuctionRequest {
    fn validate(&self) -> Result<(), MarketError> {
        if self.seller_anonymous_id.as_str().trim().is_empty() {
            return Err(MarketError::validation("sellerAnonymousId must not be empty"));
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/auctions", post(submit_auction))
}

/// POST /v1/auctions
#[utoipa::path(
    post,
    path = "/v1/auctions",
    request_body = SubmitAuctionRequest,
    responses(
        (status = 201, description = "Auction queued for review", body = AuctionRecord),
        (status = 422, description = "Invalid listing", body = crate::error::ErrorBody),
    ),
    tag = "auctions"
)]
async fn submit_auction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<SubmitAuctionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuctionRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let record = state
        .moderation
        .submit_for_review(NewAuction {
            seller_id: caller.user_id,
            seller_anonymous_id: req.seller_anonymous_id,
            title: req.title,
            category: req.category,
            auction_type: req.auction_type,
            pricing: Pricing {
                reserve_price: req.pricing.reserve_price,
                buy_now_price: req.pricing.buy_now_price,
                ..Pricing::starting_at(req.pricing.starting_bid)
            },
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

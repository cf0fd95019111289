//! # Score Subcommand
//!
//! Offline risk assessment. Reads an auction as JSON, either a stored
//! record as returned by the API or a bare submission, plus an optional
//! seller profile, and prints the same risk, priority, and auto-approval
//! verdict a moderator would see.
//!
//! Without `--seller` the listing is scored as coming from a brand-new
//! seller, which is also how the server treats unknown sellers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use veil_approval::AutoApprovalPolicy;
use veil_core::{AuctionId, AuctionRecord, NewAuction, SellerProfile};
use veil_risk::{assess, priority_score, RiskAssessment, RiskLevel};

/// Placeholder id for submissions that have not been stored yet.
pub const OFFLINE_AUCTION_ID: &str = "offline";

/// Arguments for the `veil score` subcommand.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Auction JSON: a stored auction record or a submission.
    #[arg(value_name = "AUCTION_JSON")]
    pub auction: PathBuf,

    /// Seller profile JSON.
    #[arg(long, value_name = "PROFILE_JSON")]
    pub seller: Option<PathBuf>,

    /// Exit with status 1 when the risk level is at or above this.
    #[arg(long, value_enum)]
    pub fail_on: Option<LevelArg>,

    /// Pretty-print the report.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for RiskLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Low => RiskLevel::Low,
            LevelArg::Medium => RiskLevel::Medium,
            LevelArg::High => RiskLevel::High,
        }
    }
}

/// Either shape is accepted. Stored records are tried first since they
/// carry strictly more fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuctionInput {
    Record(Box<AuctionRecord>),
    Submission(NewAuction),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub auction_id: AuctionId,
    pub risk: RiskAssessment,
    pub priority: u8,
    pub auto_approvable: bool,
    pub seller_known: bool,
}

/// Execute the score subcommand.
///
/// Returns exit code: 0 normally, 1 when `--fail-on` trips.
pub fn run_score(args: &ScoreArgs) -> Result<u8> {
    let auction = parse_auction(&read(&args.auction)?, Utc::now())
        .with_context(|| format!("failed to parse auction: {}", args.auction.display()))?;
    let seller = match &args.seller {
        Some(path) => Some(
            parse_profile(&read(path)?)
                .with_context(|| format!("failed to parse seller profile: {}", path.display()))?,
        ),
        None => None,
    };

    let policy = AutoApprovalPolicy::from_env().context("invalid auto-approval settings")?;
    let report = score(&auction, seller.as_ref(), &policy, Utc::now());
    tracing::info!(
        auction_id = %report.auction_id,
        score = report.risk.score,
        level = %report.risk.level,
        "scored auction"
    );

    let out = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");

    Ok(match args.fail_on {
        Some(limit) if report.risk.level >= RiskLevel::from(limit) => 1,
        _ => 0,
    })
}

/// Score one auction the way the moderation queue does.
pub fn score(
    auction: &AuctionRecord,
    seller: Option<&SellerProfile>,
    policy: &AutoApprovalPolicy,
    now: DateTime<Utc>,
) -> ScoreReport {
    ScoreReport {
        auction_id: auction.auction_id.clone(),
        risk: assess(auction, seller),
        priority: priority_score(auction, seller, now),
        auto_approvable: policy.admits(auction, seller),
        seller_known: seller.is_some(),
    }
}

/// A bare submission is validated and materialized as a fresh pending
/// record created at `now`.
pub fn parse_auction(json: &str, now: DateTime<Utc>) -> Result<AuctionRecord> {
    match serde_json::from_str::<AuctionInput>(json)? {
        AuctionInput::Record(record) => Ok(*record),
        AuctionInput::Submission(new) => {
            new.validate()?;
            Ok(AuctionRecord::submitted(
                AuctionId::new(OFFLINE_AUCTION_ID),
                new,
                now,
            ))
        }
    }
}

pub fn parse_profile(json: &str) -> Result<SellerProfile> {
    Ok(serde_json::from_str(json)?)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

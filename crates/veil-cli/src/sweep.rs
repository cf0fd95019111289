//! # Sweep Subcommand
//!
//! Triggers the auto-approval sweep on a running server via
//! `POST /v1/admin/auctions/auto-approve`. The default is a dry run that
//! only lists eligible auctions; `--apply` approves them.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use veil_core::AuctionRecord;

pub const SWEEP_PATH: &str = "v1/admin/auctions/auto-approve";

/// Arguments for the `veil sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Base URL of the VeilBid API.
    #[arg(long, env = "VEIL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: Url,

    /// Admin bearer token, `admin:{user_id}:{secret}`.
    #[arg(long, env = "VEIL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Approve the eligible auctions instead of only listing them.
    #[arg(long)]
    pub apply: bool,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepRequest {
    dry_run: bool,
}

/// Server response, trimmed to what the CLI reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub dry_run: bool,
    pub eligible_for_auto_approval: Vec<AuctionRecord>,
    pub approved: Vec<AuctionRecord>,
    pub count: usize,
}

/// Execute the sweep subcommand.
///
/// Returns exit code: 0 on success. Transport and server errors are
/// returned as `Err`.
pub fn run_sweep(args: &SweepArgs) -> Result<u8> {
    if args.token.is_none() {
        tracing::warn!("no token given; this only works against a server with auth disabled");
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime.block_on(request_sweep(args))?;

    let verb = if outcome.dry_run { "eligible" } else { "approved" };
    let listed = if outcome.dry_run {
        &outcome.eligible_for_auto_approval
    } else {
        &outcome.approved
    };
    for auction in listed {
        println!(
            "{}\t{}\t{}\t{}",
            auction.auction_id, auction.category, auction.pricing.starting_bid, auction.title
        );
    }
    println!("{} auction(s) {verb}", outcome.count);
    Ok(0)
}

pub async fn request_sweep(args: &SweepArgs) -> Result<SweepOutcome> {
    let endpoint = sweep_url(&args.api_url)?;
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(args.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let mut request = client.post(endpoint.clone()).json(&SweepRequest {
        dry_run: !args.apply,
    });
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }

    tracing::info!(url = %endpoint, apply = args.apply, "requesting auto-approval sweep");
    let response = request
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server returned {status}: {body}");
    }
    response
        .json::<SweepOutcome>()
        .await
        .context("unexpected sweep response")
}

/// Join [`SWEEP_PATH`] onto the base URL, keeping any path prefix.
pub fn sweep_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SWEEP_PATH)
        .with_context(|| format!("invalid API URL: {base}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_onto_root() {
        let url = sweep_url(&Url::parse("http://localhost:8080").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v1/admin/auctions/auto-approve");
    }

    #[test]
    fn url_keeps_path_prefix() {
        let url = sweep_url(&Url::parse("https://ops.example/veil").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://ops.example/veil/v1/admin/auctions/auto-approve");
    }

    #[test]
    fn request_body_is_camel_case() {
        let body = serde_json::to_value(SweepRequest { dry_run: true }).unwrap();
        assert_eq!(body, serde_json::json!({ "dryRun": true }));
    }
}

//! # veil-api — Binary Entry Point
//!
//! Reads configuration from the environment and serves the API.
//! Without `SETTLEMENT_URL` releases go to the in-process mock gateway.

use std::sync::Arc;

use veil_api::state::{AppConfig, AppState};
use veil_approval::AutoApprovalPolicy;
use veil_escrow::EscrowConfig;
use veil_settlement::{
    HttpSettlementGateway, MockSettlementGateway, SettlementConfig, SettlementGateway,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let escrow_config = EscrowConfig::from_env()?;
    let policy = AutoApprovalPolicy::from_env()?;
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set. Authentication is disabled.");
    }

    let gateway: Arc<dyn SettlementGateway> = match SettlementConfig::from_env()? {
        Some(settlement) => {
            tracing::info!(base_url = %settlement.base_url, "settlement gateway configured");
            Arc::new(HttpSettlementGateway::new(settlement).map_err(|e| {
                tracing::error!("Failed to create settlement gateway: {e}");
                e
            })?)
        }
        None => {
            tracing::warn!("SETTLEMENT_URL not set. Releases use the mock settlement gateway.");
            Arc::new(MockSettlementGateway::new())
        }
    };

    tracing::info!(?config, ?escrow_config, ?policy, "configuration loaded");
    let port = config.port;
    let state = AppState::assemble(config, gateway, escrow_config, policy);
    let app = veil_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("VeilBid API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

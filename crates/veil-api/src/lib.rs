//! # veil-api — HTTP Surface for the VeilBid Engine
//!
//! A thin axum adapter over [`veil_approval::ModerationService`] and
//! [`veil_escrow::EscrowService`]. Handlers authenticate the caller, decode
//! the request and translate [`veil_core::MarketError`] into HTTP errors;
//! every rule lives in the engines.
//!
//! ## API Surface
//!
//! | Prefix                   | Module                      | Audience |
//! |--------------------------|-----------------------------|----------|
//! | `/v1/auctions`           | [`routes::auctions`]        | sellers  |
//! | `/v1/admin/approvals/*`  | [`routes::approvals`]       | admins   |
//! | `/v1/admin/auctions/*`   | [`routes::approvals`]       | admins   |
//! | `/v1/escrows/*`          | [`routes::escrows`]         | parties  |
//! | `/v1/admin/escrows/*`    | [`routes::escrows`]         | admins   |
//! | `/v1/notifications`      | [`routes::notifications`]   | everyone |
//! | `/v1/admin/metrics`      | [`routes::metrics`]         | admins   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated from utoipa annotations and served at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// [`app`] with caller-owned counters, so the embedding process can read
/// them without going through HTTP.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_secret.clone(),
    };

    let api = Router::new()
        .merge(routes::auctions::router())
        .merge(routes::approvals::router())
        .merge(routes::escrows::router())
        .merge(routes::notifications::router())
        .merge(routes::metrics::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}

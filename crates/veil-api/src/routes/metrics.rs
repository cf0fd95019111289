//! # Operational Metrics
//!
//! Admin-only read of the request counters kept by
//! [`crate::middleware::metrics`].

use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/metrics", get(read_metrics))
}

/// GET /v1/admin/metrics
///
/// The request being served is not yet counted.
#[utoipa::path(
    get,
    path = "/v1/admin/metrics",
    responses(
        (status = 200, description = "Counter snapshot", body = MetricsSnapshot),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
async fn read_metrics(
    caller: CallerIdentity,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Json<MetricsSnapshot>, AppError> {
    require_role(&caller, Role::Admin)?;
    Ok(Json(metrics.snapshot()))
}

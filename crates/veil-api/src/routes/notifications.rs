//! # In-App Notifications
//!
//! The caller's inbox, newest first.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;
use veil_notify::Notification;

use crate::auth::CallerIdentity;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct InboxResponse {
    pub count: usize,
    pub notifications: Vec<Notification>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/notifications", get(list_notifications))
}

/// GET /v1/notifications
#[utoipa::path(
    get,
    path = "/v1/notifications",
    responses(
        (status = 200, description = "Caller's inbox, newest first", body = InboxResponse),
    ),
    tag = "notifications"
)]
async fn list_notifications(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<InboxResponse> {
    let notifications = state.inbox.for_user(&caller.user_id);
    Json(InboxResponse {
        count: notifications.len(),
        notifications,
    })
}

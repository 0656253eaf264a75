use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::sync::ListenerState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// State of the Firebase sensor sync listener
    pub sync: ListenerState,
}

/// Health check endpoint
///
/// Returns 200 OK while the HTTP server is up, whatever the sync listener
/// state. Not rate-limited.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let sync = *state.sync_status.borrow();
    Json(HealthResponse { status: "ok", sync })
}

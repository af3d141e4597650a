use crate::metrics::MetricsSnapshot;
use crate::state::AppState;
use crate::types::StatusResponse;
use axum::{extract::State, response::IntoResponse, Json};

// Liveness probe - no auth, no database access
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
)]
pub async fn healthz() -> impl IntoResponse {
    Json(StatusResponse { status: "ok".into() })
}

// JSON snapshot of the operational counters
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Operations",
    responses((status = 200, description = "Counter snapshot", body = MetricsSnapshot)),
    security(("api_key" = [])),
)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

use axum::{extract::State, response::IntoResponse, Json};

use super::repo_failure;
use crate::error::{AppResult, ErrorBody};
use crate::state::AppState;
use crate::types::{Category, StatusResponse};

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "All categories", body = [Category]),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = state.categories().list().await.map_err(repo_failure("list categories", None))?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/init-categories",
    tag = "Categories",
    responses(
        (status = 200, description = "Default categories present", body = StatusResponse),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn init_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let inserted = state.categories().seed_defaults().await.map_err(repo_failure("initialize categories", None))?;
    tracing::info!(inserted, "default categories seeded");
    Ok(Json(StatusResponse { status: "categories initialized".into() }))
}

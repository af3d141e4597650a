use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::repo_failure;
use crate::error::{validation, AppError, AppResult, ErrorBody};
use crate::state::AppState;
use crate::types::{StatusResponse, User, UserCreate};

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid name or email", body = ErrorBody),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(user) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validation::validate_user_name(&user.name)?;
    validation::validate_email(&user.email)?;

    let created = state.users().create(&user).await.map_err(repo_failure("create user", None))?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User and their ads removed", body = StatusResponse),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn delete_user(State(state): State<AppState>, Path(raw_id): Path<String>) -> AppResult<impl IntoResponse> {
    let id = validation::parse_id(&raw_id, "user")?;
    state.users().delete(id).await.map_err(repo_failure("delete user", Some(id)))?;
    Ok(Json(StatusResponse::success()))
}

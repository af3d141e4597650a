//! HTTP route handlers and the router that wires them up.
//!
//! - `ads`: ad lifecycle, including the image upload protocol
//! - `users`: user creation and deletion
//! - `categories`: category listing and seeding
//! - `health`: liveness probe and metrics
//! - `docs`: OpenAPI document and Swagger UI

pub mod ads;
pub mod categories;
pub mod docs;
pub mod health;
pub mod users;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::{
    routing::{delete, get, patch, post},
    BoxError, Router,
};
use tower::ServiceBuilder;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{AppError, RepoError};
use crate::middleware::{require_api_key, ApiKey};
use crate::state::AppState;

/// Builds the application router. Everything except `/health` and the API docs requires
/// the `Key` header.
pub fn router(state: AppState) -> Router {
    let api_key = ApiKey::new(state.config.auth.api_key.as_str());
    let body_limit = state.config.server.max_upload_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let protected = Router::new()
        .route("/ads", get(ads::list_ads).post(ads::create_ad))
        .route("/ads/{id}", get(ads::get_ad).put(ads::update_ad).delete(ads::delete_ad))
        .route("/ads/{id}/toggle", patch(ads::toggle_ad))
        .route("/users", post(users::create_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/categories", get(categories::list_categories))
        .route("/init-categories", get(categories::init_categories))
        .route("/metrics", get(health::metrics))
        .route_layer(from_fn_with_state(api_key, require_api_key));

    Router::new()
        .route("/health", get(health::healthz))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        // Dropping the handler future on timeout rolls back any open transaction
        .layer(ServiceBuilder::new().layer(HandleErrorLayer::new(handle_timeout)).timeout(timeout))
}

async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
        AppError::Timeout
    } else {
        AppError::internal("internal server error", anyhow::anyhow!(err))
    }
}

/// Logs a persistence failure with its operation and id, then translates it.
pub(crate) fn repo_failure(operation: &'static str, id: Option<i64>) -> impl FnOnce(RepoError) -> AppError {
    move |err| {
        match &err {
            RepoError::Storage(e) => tracing::error!(operation, ?id, error = %e, "storage failure"),
            other => tracing::debug!(operation, ?id, reason = %other, "request rejected"),
        }
        AppError::from_repo(err, &format!("failed to {}", operation))
    }
}

//! Ad endpoints.
//!
//! Creating or replacing an image is a two-step write across the image store and the
//! database with no shared transaction. The file is written first and held as a
//! [`PendingImage`] until the row referencing it is committed. A failed write removes it
//! again right away. A request dropped on timeout or disconnect drops the guard, which
//! removes the file in the background. This is compensation, not atomicity: a process
//! crash between the two steps can still orphan a file.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::repo_failure;
use crate::error::{validation, AppError, AppResult, ErrorBody};
use crate::state::AppState;
use crate::storage::{generate_filename, image_extension, PendingImage};
use crate::types::{Ad, AdCreate, AdUpdate, StatusResponse, ToggleResponse};

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// A buffered multipart form: text fields by name plus the optional `image` part.
#[derive(Default)]
struct AdForm {
    fields: HashMap<String, String>,
    image: Option<Upload>,
}

impl AdForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = AdForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read image: {}", e)))?;
                // Browsers send an empty file part when nothing was selected
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.image = Some(Upload { file_name, bytes });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read field {}: {}", name, e)))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn to_create(&self) -> AppResult<AdCreate> {
        let user_id = validation::parse_ref_id(self.field("user_id"), "user_id")?;
        let category_id = validation::parse_ref_id(self.field("category_id"), "category_id")?;
        let title = self.field("title").unwrap_or_default();
        validation::validate_title(title)?;
        let description = self.field("description").unwrap_or_default();
        validation::validate_description(description)?;
        let price = validation::parse_price(self.field("price").unwrap_or_default())?;

        Ok(AdCreate {
            user_id,
            category_id,
            title: title.to_owned(),
            description: description.to_owned(),
            price,
        })
    }

    fn to_update(&self) -> AppResult<AdUpdate> {
        let (Some(title), Some(description), Some(price)) =
            (self.field("title"), self.field("description"), self.field("price"))
        else {
            return Err(AppError::BadRequest("title, description and price are required".into()));
        };
        validation::validate_title(title)?;
        validation::validate_description(description)?;
        let price = validation::parse_price(price)?;

        Ok(AdUpdate { title: title.to_owned(), description: description.to_owned(), price })
    }
}

/// Checks the extension, picks a fresh name and writes the file.
async fn store_upload(state: &AppState, upload: &Upload) -> AppResult<PendingImage> {
    let ext = image_extension(&upload.file_name)
        .ok_or_else(|| AppError::BadRequest("only png/jpg/jpeg allowed".into()))?;
    let filename = generate_filename(&ext);
    state.images.stage(&filename, &upload.bytes).await.map_err(|e| {
        tracing::error!(filename = %filename, error = %e, "failed to save image");
        AppError::internal("cannot save image", e)
    })
}

#[utoipa::path(
    get,
    path = "/ads/{id}",
    tag = "Ads",
    params(("id" = i64, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad with its user and category", body = Ad),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 404, description = "Ad not found", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn get_ad(State(state): State<AppState>, Path(raw_id): Path<String>) -> AppResult<impl IntoResponse> {
    let id = validation::parse_id(&raw_id, "ad")?;
    let ad = state
        .ads()
        .fetch_by_id(id)
        .await
        .map_err(repo_failure("get ad", Some(id)))?
        .ok_or_else(|| AppError::NotFound("ad not found".into()))?;
    Ok(Json(ad))
}

#[utoipa::path(
    get,
    path = "/ads",
    tag = "Ads",
    responses(
        (status = 200, description = "All ads, newest first", body = [Ad]),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn list_ads(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let ads = state.ads().fetch_all().await.map_err(repo_failure("list ads", None))?;
    Ok(Json(ads))
}

#[utoipa::path(
    post,
    path = "/ads",
    tag = "Ads",
    request_body(
        content_type = "multipart/form-data",
        description = "Fields `image` (png/jpg/jpeg), `user_id`, `category_id`, `title`, `description`, `price`"
    ),
    responses(
        (status = 201, description = "Ad created", body = Ad),
        (status = 400, description = "Invalid field, image or reference", body = ErrorBody),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn create_ad(State(state): State<AppState>, multipart: Multipart) -> AppResult<impl IntoResponse> {
    let form = AdForm::read(multipart).await?;
    let upload = form.image.as_ref().ok_or_else(|| AppError::BadRequest("image is required".into()))?;
    let image = store_upload(&state, upload).await?;

    let created = match form.to_create() {
        Ok(cmd) => state.ads().create(&cmd, image.filename()).await.map_err(repo_failure("create ad", None)),
        Err(e) => Err(e),
    };
    match created {
        Ok(ad) => {
            image.commit();
            Ok((StatusCode::CREATED, Json(ad)))
        }
        Err(e) => {
            image.discard("ad creation failed").await;
            Err(e)
        }
    }
}

#[utoipa::path(
    put,
    path = "/ads/{id}",
    tag = "Ads",
    params(("id" = i64, Path, description = "Ad id")),
    request_body(
        content_type = "multipart/form-data",
        description = "Fields `title`, `description`, `price` and an optional replacement `image`"
    ),
    responses(
        (status = 200, description = "Ad updated", body = StatusResponse),
        (status = 400, description = "Invalid field or image", body = ErrorBody),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 404, description = "Ad not found", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn update_ad(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let id = validation::parse_id(&raw_id, "ad")?;
    let form = AdForm::read(multipart).await?;
    let changes = form.to_update()?;

    let mut staged = match &form.image {
        Some(upload) => Some(store_upload(&state, upload).await?),
        None => None,
    };
    let new_image = staged.as_ref().map(|image| image.filename().to_owned());

    // The new file is kept the moment its reference commits, before the old one is removed
    let updated = state
        .ads()
        .update_then(id, &changes, new_image.as_deref(), || {
            if let Some(image) = staged.take() {
                image.commit();
            }
        })
        .await
        .map_err(repo_failure("update ad", Some(id)));
    if let Err(e) = updated {
        if let Some(image) = staged {
            image.discard("ad update failed").await;
        }
        return Err(e);
    }
    Ok(Json(StatusResponse::success()))
}

#[utoipa::path(
    patch,
    path = "/ads/{id}/toggle",
    tag = "Ads",
    params(("id" = i64, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Enabled flag inverted", body = ToggleResponse),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 404, description = "Ad not found", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn toggle_ad(State(state): State<AppState>, Path(raw_id): Path<String>) -> AppResult<impl IntoResponse> {
    let id = validation::parse_id(&raw_id, "ad")?;
    let ads = state.ads();
    let current = ads.enabled_state(id).await.map_err(repo_failure("get ad status", Some(id)))?;
    let enabled = !current;
    ads.toggle(id, enabled).await.map_err(repo_failure("toggle ad", Some(id)))?;
    Ok(Json(ToggleResponse { status: "success".into(), enabled }))
}

#[utoipa::path(
    delete,
    path = "/ads/{id}",
    tag = "Ads",
    params(("id" = i64, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad and its image removed", body = StatusResponse),
        (status = 401, description = "Missing or wrong key", body = ErrorBody),
        (status = 404, description = "Ad not found", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
pub async fn delete_ad(State(state): State<AppState>, Path(raw_id): Path<String>) -> AppResult<impl IntoResponse> {
    let id = validation::parse_id(&raw_id, "ad")?;
    state.ads().delete(id).await.map_err(repo_failure("delete ad", Some(id)))?;
    Ok(Json(StatusResponse::success()))
}

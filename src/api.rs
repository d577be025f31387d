//! HTTP handlers for the recipe box API.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::media::RenameOutcome;
use crate::models::{
    ImportRequest, PathRequest, Recipe, RenameRequest, SaveResponse, SuccessResponse,
    UploadResponse,
};
use crate::upload;
use crate::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn list_recipes(State(state): State<AppState>) -> ApiResult<Json<Vec<Recipe>>> {
    let recipes = state.store.load().await?;
    Ok(Json(recipes))
}

pub async fn save_recipes(
    State(state): State<AppState>,
    Json(recipes): Json<Vec<Recipe>>,
) -> ApiResult<Json<SaveResponse>> {
    let count = state.store.save(&recipes).await?;
    info!(count, "saved recipe collection");
    Ok(Json(SaveResponse {
        success: true,
        count,
    }))
}

pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let form = upload::read_form(multipart).await?;
    let image = form
        .image
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let path = upload::store_image(&state.media, form.folder.as_deref(), &image).await?;
    Ok(Json(UploadResponse { path }))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let path = required(req.path, "No path provided")?;
    state.media.delete_file(&path).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn delete_folder(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let path = required(req.path, "No path provided")?;
    state.media.delete_folder(&path).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn rename_folder(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (old_path, new_path) = match (non_empty(req.old_path), non_empty(req.new_path)) {
        (Some(old), Some(new)) => (old, new),
        _ => return Err(ApiError::BadRequest("Missing paths".to_string())),
    };

    match state.media.rename_folder(&old_path, &new_path).await? {
        RenameOutcome::Renamed => Ok(Json(SuccessResponse::ok())),
        RenameOutcome::SourceMissing => Ok(Json(SuccessResponse::with_message(
            "Old folder not found, nothing to rename",
        ))),
    }
}

pub async fn import_recipe(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Json<Recipe>> {
    let url = required(req.url, "No URL provided")?;
    let recipe = state.importer.import(&url).await?;
    Ok(Json(recipe))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    non_empty(value).ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

// src/handlers/images.rs
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MediaArtifact, MediaBatchReport, MediaKind, MediaParams, SceneImage, ScriptImage};
use super::{optional_json, run_detached};
use crate::AppState;

pub fn image_routes() -> Router {
    Router::new()
        .route("/images/generate", post(generate_scene_image))
        .route("/images/generate-for-script/:script_id", post(generate_for_script))
        .route("/images/scene-images/:image_id", put(update_scene_image))
        .route("/images/list/:script_id", get(list_script_images))
}

#[derive(Debug, Deserialize)]
pub struct SceneImageRequest {
    pub scene_id: Uuid,
    pub prompt: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ImageUpdateRequest {
    pub prompt: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

fn size_params(width: Option<i32>, height: Option<i32>) -> MediaParams {
    MediaParams {
        width,
        height,
        ..MediaParams::default()
    }
}

/// POST /images/generate - (re)generate the image of one scene
pub async fn generate_scene_image(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<SceneImageRequest>,
) -> AppResult<Json<SceneImage>> {
    let coordinator = state.coordinator.clone();
    let artifact = run_detached(async move {
        coordinator
            .update_media(
                request.scene_id,
                MediaKind::Image,
                request.prompt.as_deref(),
                &size_params(request.width, request.height),
            )
            .await
    })
    .await?;

    match artifact {
        MediaArtifact::Image(image) => Ok(Json(image)),
        MediaArtifact::Voice(_) => Err(AppError::Validation("unexpected voice artifact".into())),
    }
}

/// POST /images/generate-for-script/:script_id
pub async fn generate_for_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<MediaBatchReport>> {
    let params: MediaParams = optional_json(&body)?;
    let coordinator = state.coordinator.clone();
    let report = run_detached(async move {
        coordinator
            .generate_media_for_script(script_id, MediaKind::Image, &params)
            .await
    })
    .await?;
    Ok(Json(report))
}

/// PUT /images/scene-images/:image_id
pub async fn update_scene_image(
    Path(image_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ImageUpdateRequest>,
) -> AppResult<Json<SceneImage>> {
    let coordinator = state.coordinator.clone();
    let image = run_detached(async move {
        coordinator
            .update_scene_image(
                image_id,
                request.prompt.as_deref(),
                &size_params(request.width, request.height),
            )
            .await
    })
    .await?;
    Ok(Json(image))
}

/// GET /images/list/:script_id
pub async fn list_script_images(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Vec<ScriptImage>>> {
    if state.store.get_script(script_id).await?.is_none() {
        return Err(AppError::not_found("Script", script_id));
    }
    Ok(Json(state.store.list_script_images(script_id).await?))
}

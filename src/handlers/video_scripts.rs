// src/handlers/video_scripts.rs
//! Script generation, enhancement and public listing

use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CreateScriptRequest, Script, ScriptDetail, ScriptFilter};
use crate::AppState;

pub const MAX_PAGE_SIZE: i64 = 100;

pub fn video_script_routes() -> Router {
    Router::new()
        .route("/video-scripts/generate", post(generate_script))
        .route("/video-scripts/enhance/:script_id", post(enhance_script))
        .route("/video-scripts/scripts", get(list_scripts))
        .route("/video-scripts/scripts/:script_id", get(get_script))
        .route("/video-scripts/scripts/:script_id/save", post(save_script))
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Fill a filter's window, rejecting negative offsets and oversized pages.
    pub fn apply(&self, mut filter: ScriptFilter) -> AppResult<ScriptFilter> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(MAX_PAGE_SIZE);
        if skip < 0 {
            return Err(AppError::Validation("skip must not be negative".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        filter.skip = skip;
        filter.limit = limit;
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveQuery {
    pub user_id: Uuid,
}

/// POST /video-scripts/generate
pub async fn generate_script(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CreateScriptRequest>,
) -> AppResult<Json<ScriptDetail>> {
    let detail = state.coordinator.generate_script(&request, None).await?;
    Ok(Json(detail))
}

/// POST /video-scripts/enhance/:script_id
pub async fn enhance_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<ScriptDetail>> {
    let detail = state.coordinator.enhance_script(script_id).await?;
    Ok(Json(detail))
}

/// GET /video-scripts/scripts?skip&limit
pub async fn list_scripts(
    Query(pagination): Query<Pagination>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Vec<Script>>> {
    let filter = pagination.apply(ScriptFilter::default())?;
    let scripts = state.store.list_scripts(&filter).await?;
    Ok(Json(scripts))
}

/// GET /video-scripts/scripts/:script_id
pub async fn get_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<ScriptDetail>> {
    state
        .store
        .get_script_detail(script_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Script", script_id))
}

/// POST /video-scripts/scripts/:script_id/save?user_id=
pub async fn save_script(
    Path(script_id): Path<Uuid>,
    Query(query): Query<SaveQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Script>> {
    let script = state.coordinator.save_script(script_id, query.user_id).await?;
    tracing::info!("💾 Script {} saved for user {}", script_id, query.user_id);
    Ok(Json(script))
}

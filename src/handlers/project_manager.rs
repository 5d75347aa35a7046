// src/handlers/project_manager.rs
//! Per-user script management. Every route requires a valid JWT.

use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::video_scripts::Pagination;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::{Script, ScriptChanges, ScriptDetail, ScriptFilter, ScriptStatus};
use crate::AppState;

pub fn project_manager_routes() -> Router {
    Router::new()
        .route("/project-manager/user/:user_id/scripts", get(list_user_scripts))
        .route(
            "/project-manager/scripts/:script_id",
            get(get_script).put(update_script).delete(delete_script),
        )
        .route("/project-manager/scripts/:script_id/archive", post(archive_script))
        .route("/project-manager/scripts/:script_id/restore", post(restore_script))
        .route_layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
pub struct UserScriptsQuery {
    pub status: Option<ScriptStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

fn forbidden() -> AppError {
    AppError::Forbidden("You do not have access to these scripts".into())
}

/// Load a script the caller may act on. Unowned scripts are open to everyone.
async fn accessible_script(state: &AppState, claims: &Claims, script_id: Uuid) -> AppResult<Script> {
    let script = state
        .store
        .get_script(script_id)
        .await?
        .ok_or_else(|| AppError::not_found("Script", script_id))?;

    match script.creator_id {
        Some(owner) if !claims.can_access_user(owner) => Err(forbidden()),
        _ => Ok(script),
    }
}

/// GET /project-manager/user/:user_id/scripts?status=&skip=&limit=
pub async fn list_user_scripts(
    Path(user_id): Path<Uuid>,
    Query(query): Query<UserScriptsQuery>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<Script>>> {
    if !claims.can_access_user(user_id) {
        tracing::warn!("User {} tried to list scripts of {}", claims.sub, user_id);
        return Err(forbidden());
    }

    let pagination = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let filter = pagination.apply(ScriptFilter {
        creator_id: Some(user_id),
        status: query.status,
        ..ScriptFilter::default()
    })?;

    Ok(Json(state.store.list_scripts(&filter).await?))
}

/// GET /project-manager/scripts/:script_id
pub async fn get_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ScriptDetail>> {
    let script = accessible_script(&state, &claims, script_id).await?;
    let scenes = state.store.list_scenes(script_id).await?;
    Ok(Json(ScriptDetail { script, scenes }))
}

/// PUT /project-manager/scripts/:script_id
pub async fn update_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(changes): Json<ScriptChanges>,
) -> AppResult<Json<Script>> {
    accessible_script(&state, &claims, script_id).await?;
    let script = state.coordinator.update_script(script_id, &changes).await?;
    Ok(Json(script))
}

/// DELETE /project-manager/scripts/:script_id
pub async fn delete_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Value>> {
    accessible_script(&state, &claims, script_id).await?;
    state.coordinator.delete_script(script_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Script {} deleted", script_id),
    })))
}

/// POST /project-manager/scripts/:script_id/archive
pub async fn archive_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Script>> {
    accessible_script(&state, &claims, script_id).await?;
    Ok(Json(state.coordinator.archive_script(script_id).await?))
}

/// POST /project-manager/scripts/:script_id/restore
pub async fn restore_script(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Script>> {
    accessible_script(&state, &claims, script_id).await?;
    Ok(Json(state.coordinator.restore_script(script_id).await?))
}

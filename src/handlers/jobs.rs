// src/handlers/jobs.rs
//! Background media jobs: enqueue and poll

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::jobs::{Job, JobId};
use crate::models::{MediaKind, MediaParams};
use crate::AppState;

pub fn job_routes() -> Router {
    Router::new()
        .route("/jobs/media/:script_id", post(enqueue_media_job))
        .route("/jobs/script/:script_id", get(list_script_jobs))
        .route("/jobs/:job_id", get(get_job))
}

#[derive(Debug, Deserialize)]
pub struct MediaJobRequest {
    pub kind: MediaKind,
    #[serde(flatten)]
    pub params: MediaParams,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: JobId,
    #[serde(flatten)]
    pub job: Job,
}

/// POST /jobs/media/:script_id - 202 with the queued job
pub async fn enqueue_media_job(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<MediaJobRequest>,
) -> AppResult<(StatusCode, Json<JobAccepted>)> {
    state.coordinator.validate_params(&request.params)?;
    if state.store.get_script(script_id).await?.is_none() {
        return Err(AppError::not_found("Script", script_id));
    }

    let job = state
        .job_manager
        .enqueue_media_job(
            state.coordinator.clone(),
            script_id,
            request.kind,
            request.params,
        )
        .await;

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id: job.id, job })))
}

/// GET /jobs/:job_id
pub async fn get_job(
    Path(job_id): Path<JobId>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Job>> {
    state
        .job_manager
        .get_job(job_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Job", job_id))
}

/// GET /jobs/script/:script_id
pub async fn list_script_jobs(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Vec<Job>>> {
    Ok(Json(state.job_manager.jobs_for_script(script_id).await))
}

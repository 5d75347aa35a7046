// src/handlers/voice.rs
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MediaArtifact, MediaBatchReport, MediaKind, MediaParams, ScriptVoice, VoiceAudio};
use super::{optional_json, run_detached};
use crate::AppState;

pub fn voice_routes() -> Router {
    Router::new()
        .route("/voice/text-to-speech", post(text_to_speech))
        .route("/voice/script-to-speech/:script_id", post(script_to_speech))
        .route("/voice/update/:scene_id", put(update_scene_voice))
        .route("/voice/list/:script_id", get(list_script_voices))
}

#[derive(Debug, Deserialize)]
pub struct TextToSpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub speed: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TextToSpeechResponse {
    pub success: bool,
    pub audio_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceUpdateRequest {
    pub text: Option<String>,
    pub voice_id: Option<String>,
    pub speed: Option<f64>,
}

/// POST /voice/text-to-speech - preview, nothing is stored
pub async fn text_to_speech(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<TextToSpeechRequest>,
) -> AppResult<Json<TextToSpeechResponse>> {
    let audio_url = state
        .coordinator
        .preview_voice(&request.text, request.voice_id.as_deref(), request.speed)
        .await?;
    Ok(Json(TextToSpeechResponse {
        success: true,
        audio_url,
    }))
}

/// POST /voice/script-to-speech/:script_id
pub async fn script_to_speech(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<MediaBatchReport>> {
    let params: MediaParams = optional_json(&body)?;
    let coordinator = state.coordinator.clone();
    let report = run_detached(async move {
        coordinator
            .generate_media_for_script(script_id, MediaKind::Voice, &params)
            .await
    })
    .await?;
    Ok(Json(report))
}

/// PUT /voice/update/:scene_id - regenerate one scene's narration
pub async fn update_scene_voice(
    Path(scene_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<VoiceUpdateRequest>,
) -> AppResult<Json<VoiceAudio>> {
    let params = MediaParams {
        voice_id: request.voice_id,
        speed: request.speed,
        ..MediaParams::default()
    };

    let coordinator = state.coordinator.clone();
    let artifact = run_detached(async move {
        coordinator
            .update_media(scene_id, MediaKind::Voice, request.text.as_deref(), &params)
            .await
    })
    .await?;

    match artifact {
        MediaArtifact::Voice(voice) => Ok(Json(voice)),
        MediaArtifact::Image(_) => Err(AppError::Validation("unexpected image artifact".into())),
    }
}

/// GET /voice/list/:script_id
pub async fn list_script_voices(
    Path(script_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<Vec<ScriptVoice>>> {
    if state.store.get_script(script_id).await?.is_none() {
        return Err(AppError::not_found("Script", script_id));
    }
    Ok(Json(state.store.list_script_voices(script_id).await?))
}

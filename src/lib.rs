// lib.rs - Application modules, shared state and the HTTP router
pub mod config;
pub mod db;
pub mod error;
pub mod generators;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod openrouter_client; // 🧠 Script generation via OpenRouter
pub mod replicate_client; // 🖼️ Scene images via Replicate
pub mod store;
pub mod tiktok_client; // 🎵 TikTok search via RapidAPI
pub mod tts_client; // 🎙️ Google Cloud Text-to-Speech
pub mod workflow;
pub mod youtube_client; // 📺 Reference video search

use axum::{response::Json, routing::get, Extension, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::store::ScriptStore;
use crate::workflow::WorkflowCoordinator;

// AppState holds the script store, the workflow coordinator, the job manager and optional search clients
pub struct AppState {
    pub store: Arc<dyn ScriptStore>,
    pub coordinator: Arc<WorkflowCoordinator>,
    pub job_manager: jobs::SharedJobManager,
    pub youtube_client: Option<youtube_client::YouTubeClient>,
    pub tiktok_client: Option<tiktok_client::TikTokClient>,
    pub jwt_secret: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::video_scripts::video_script_routes())
        .merge(handlers::images::image_routes())
        .merge(handlers::voice::voice_routes())
        .merge(handlers::project_manager::project_manager_routes())
        .merge(handlers::jobs::job_routes())
        .merge(handlers::video_search::video_search_routes())
        .merge(handlers::content_suggestion::content_suggestion_routes())
        .route("/api/status", get(api_status))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("❌ Store health check failed: {}", e);
            false
        }
    };

    Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_ok,
        "script_generator": state.coordinator.script_generator_name(),
        "image_generation": state.coordinator.image_generation_enabled(),
        "voice_generation": state.coordinator.voice_generation_enabled(),
        "youtube_search": state.youtube_client.is_some(),
        "tiktok_search": state.tiktok_client.is_some(),
    }))
}

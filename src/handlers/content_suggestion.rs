// src/handlers/content_suggestion.rs
use axum::{extract::Extension, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::video_search::youtube_videos;
use crate::error::AppResult;
use crate::youtube_client::VideoInfo;
use crate::AppState;

pub fn content_suggestion_routes() -> Router {
    Router::new().route("/content-suggestion/youtube/search", post(search_youtube))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keyword: String,
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub videos: Vec<VideoInfo>,
    pub total_results: usize,
}

/// POST /content-suggestion/youtube/search
pub async fn search_youtube(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    let videos = youtube_videos(&state, &request.keyword, request.max_results).await?;
    Ok(Json(SearchResponse {
        total_results: videos.len(),
        videos,
    }))
}

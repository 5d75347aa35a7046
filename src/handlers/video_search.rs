// src/handlers/video_search.rs
//! Reference video search (YouTube, Google, TikTok)

use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::generators::GenerationError;
use crate::tiktok_client::{TikTokError, TikTokSearchPage};
use crate::youtube_client::VideoInfo;
use crate::AppState;

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const MAX_RESULTS_LIMIT: u32 = 50;

pub fn video_search_routes() -> Router {
    Router::new()
        .route("/video-search/youtube/:keyword", get(search_youtube))
        .route("/video-search/google/:keyword", get(search_google))
        .route("/video-search/tiktok/:keyword", get(search_tiktok))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TikTokQuery {
    pub cursor: Option<String>,
    pub search_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoSearchResponse {
    pub videos: Vec<VideoInfo>,
    pub total: usize,
}

pub(crate) fn check_search(keyword: &str, max_results: Option<u32>) -> AppResult<u32> {
    if keyword.trim().is_empty() {
        return Err(AppError::Validation("keyword must not be empty".into()));
    }
    let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(AppError::Validation(format!(
            "max_results must be between 1 and {}",
            MAX_RESULTS_LIMIT
        )));
    }
    Ok(max_results)
}

/// Short, most-viewed YouTube videos for `keyword`.
pub(crate) async fn youtube_videos(
    state: &AppState,
    keyword: &str,
    max_results: Option<u32>,
) -> AppResult<Vec<VideoInfo>> {
    let max_results = check_search(keyword, max_results)?;
    let client = state
        .youtube_client
        .as_ref()
        .ok_or(GenerationError::NotConfigured("YouTube search"))?;

    let videos = client
        .search_videos(keyword.trim(), max_results)
        .await
        .map_err(|e| {
            tracing::error!("YouTube search for '{}' failed: {}", keyword, e);
            GenerationError::Failed(format!("YouTube search failed: {}", e))
        })?;

    tracing::info!("📺 Found {} YouTube videos for '{}'", videos.len(), keyword);
    Ok(videos)
}

/// GET /video-search/youtube/:keyword?max_results=
pub async fn search_youtube(
    Path(keyword): Path<String>,
    Query(query): Query<SearchQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<VideoSearchResponse>> {
    let videos = youtube_videos(&state, &keyword, query.max_results).await?;
    Ok(Json(VideoSearchResponse {
        total: videos.len(),
        videos,
    }))
}

/// GET /video-search/google/:keyword?max_results= - served by the YouTube Data API
pub async fn search_google(
    Path(keyword): Path<String>,
    Query(query): Query<SearchQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<VideoSearchResponse>> {
    let videos = youtube_videos(&state, &keyword, query.max_results).await?;
    Ok(Json(VideoSearchResponse {
        total: videos.len(),
        videos,
    }))
}

/// GET /video-search/tiktok/:keyword?cursor=&search_id=
pub async fn search_tiktok(
    Path(keyword): Path<String>,
    Query(query): Query<TikTokQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> AppResult<Json<TikTokSearchPage>> {
    if keyword.trim().is_empty() {
        return Err(AppError::Validation("keyword must not be empty".into()));
    }
    let client = state
        .tiktok_client
        .as_ref()
        .ok_or(GenerationError::NotConfigured("TikTok search"))?;

    let page = client
        .search_videos(
            keyword.trim(),
            query.cursor.as_deref().unwrap_or("0"),
            query.search_id.as_deref().unwrap_or("0"),
        )
        .await
        .map_err(|e| match e {
            TikTokError::Forbidden => AppError::Forbidden(e.to_string()),
            TikTokError::RateLimited => AppError::RateLimited(e.to_string()),
            other => AppError::Generation(GenerationError::Failed(other.to_string())),
        })?;

    tracing::info!("🎵 Found {} TikTok videos for '{}'", page.total, keyword);
    Ok(Json(page))
}

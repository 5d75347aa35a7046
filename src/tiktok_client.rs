// TikTok search through the RapidAPI "tiktok-api23" gateway

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::youtube_client::VideoInfo;

const RAPIDAPI_HOST: &str = "tiktok-api23.p.rapidapi.com";

#[derive(Error, Debug)]
pub enum TikTokError {
    #[error("Access to TikTok API is forbidden. Please check your API key and subscription status.")]
    Forbidden,
    #[error("TikTok API rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Error calling TikTok API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("TikTok API error ({status}): {body}")]
    Upstream { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TikTokClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// A TikTok search hit: the common video fields plus engagement extras.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TikTokVideo {
    #[serde(flatten)]
    pub info: VideoInfo,
    pub music: String,
    pub share_count: u64,
    pub comment_count: u64,
}

/// One page of results. Pass `cursor` and `search_id` back to get the next
/// page; `cursor` is `None` once the API reports the end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TikTokSearchPage {
    pub videos: Vec<TikTokVideo>,
    pub total: usize,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub search_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchItem {
    #[serde(rename = "type", default)]
    kind: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    video_url: String,
    #[serde(default)]
    cover: String,
    #[serde(default)]
    play_count: u64,
    #[serde(default)]
    digg_count: u64,
    #[serde(default)]
    create_time: i64,
    #[serde(default)]
    author: Author,
    #[serde(default)]
    music: Music,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    share_count: u64,
    #[serde(default)]
    comment_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Author {
    #[serde(default)]
    nickname: String,
}

#[derive(Debug, Default, Deserialize)]
struct Music {
    #[serde(default)]
    title: String,
}

impl From<SearchItem> for TikTokVideo {
    fn from(item: SearchItem) -> Self {
        let published_at = chrono::DateTime::from_timestamp(item.create_time, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        TikTokVideo {
            info: VideoInfo {
                title: item.title,
                description: item.desc,
                url: item.video_url,
                thumbnail_url: Some(item.cover).filter(|c| !c.is_empty()),
                view_count: item.play_count,
                like_count: item.digg_count,
                published_at,
                platform: "tiktok".to_string(),
                duration: Some(item.duration.to_string()),
                channel_name: item.author.nickname,
            },
            music: item.music.title,
            share_count: item.share_count,
            comment_count: item.comment_count,
        }
    }
}

// The gateway returns cursor and search_id as strings or numbers.
fn as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_search_page(body: &Value) -> TikTokSearchPage {
    let videos: Vec<TikTokVideo> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<SearchItem>(item.clone()).ok())
                .filter(|item| item.kind.as_str() == Some("video"))
                .map(TikTokVideo::from)
                .collect()
        })
        .unwrap_or_default();

    let cursor = as_text(body.get("cursor"))
        .or_else(|| Some("0".to_string()))
        .filter(|c| c != "-1");

    TikTokSearchPage {
        total: videos.len(),
        has_more: !videos.is_empty(),
        cursor,
        search_id: as_text(body.get("search_id")).unwrap_or_else(|| "0".to_string()),
        videos,
    }
}

fn status_error(status: StatusCode, body: String) -> TikTokError {
    match status {
        StatusCode::FORBIDDEN => TikTokError::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => TikTokError::RateLimited,
        _ => TikTokError::Upstream {
            status: status.as_u16(),
            body,
        },
    }
}

impl TikTokClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: format!("https://{}", RAPIDAPI_HOST),
        }
    }

    /// General keyword search; `cursor` and `search_id` start at "0".
    pub async fn search_videos(
        &self,
        keyword: &str,
        cursor: &str,
        search_id: &str,
    ) -> Result<TikTokSearchPage, TikTokError> {
        let response = self
            .client
            .get(format!("{}/api/search/general", self.base_url))
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&[("keyword", keyword), ("cursor", cursor), ("search_id", search_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, body);
            tracing::error!("TikTok search for '{}' failed: {}", keyword, err);
            return Err(err);
        }

        let body: Value = response.json().await?;
        Ok(parse_search_page(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_video_items_are_kept() {
        let page = parse_search_page(&json!({
            "data": [
                {
                    "type": "video",
                    "title": "Street food tour",
                    "desc": "Night market",
                    "video_url": "https://www.tiktok.com/@cook/video/1",
                    "cover": "https://p16.tiktokcdn.com/cover.jpg",
                    "play_count": 5400,
                    "digg_count": 320,
                    "create_time": 1700000000,
                    "author": {"nickname": "cook"},
                    "music": {"title": "original sound"},
                    "duration": 42,
                    "share_count": 12,
                    "comment_count": 7
                },
                {"type": "user", "title": "someone"}
            ],
            "cursor": 12,
            "search_id": "abc"
        }));

        assert_eq!(page.total, 1);
        assert!(page.has_more);
        assert_eq!(page.cursor.as_deref(), Some("12"));
        assert_eq!(page.search_id, "abc");

        let video = &page.videos[0];
        assert_eq!(video.info.platform, "tiktok");
        assert_eq!(video.info.view_count, 5400);
        assert_eq!(video.info.channel_name, "cook");
        assert_eq!(video.info.duration.as_deref(), Some("42"));
        assert_eq!(video.info.published_at, "2023-11-14T22:13:20+00:00");
        assert_eq!(video.music, "original sound");
        assert_eq!(video.comment_count, 7);
    }

    #[test]
    fn end_of_results_clears_cursor() {
        let page = parse_search_page(&json!({"data": [], "cursor": "-1", "search_id": "abc"}));
        assert!(page.videos.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.cursor, None);

        let page = parse_search_page(&json!({"data": {"unexpected": true}}));
        assert_eq!(page.total, 0);
        assert_eq!(page.cursor.as_deref(), Some("0"));
        assert_eq!(page.search_id, "0");
    }

    #[test]
    fn forbidden_and_rate_limit_are_distinguished() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            TikTokError::Forbidden
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            TikTokError::RateLimited
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "down".into()),
            TikTokError::Upstream { status: 502, .. }
        ));
    }

    #[test]
    fn flattened_video_serializes_common_fields() {
        let video = TikTokVideo::from(SearchItem {
            kind: json!("video"),
            title: "t".into(),
            ..SearchItem::default()
        });
        let value = serde_json::to_value(&video).unwrap();
        assert_eq!(value["platform"], "tiktok");
        assert_eq!(value["thumbnail_url"], Value::Null);
        assert_eq!(value["share_count"], 0);
    }
}

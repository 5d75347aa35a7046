// YouTube Data API v3 client for reference video search
// Docs: https://developers.google.com/youtube/v3

use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

// ============================================================================
// API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

// The API returns counters as strings.
#[derive(Debug, Default, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

// ============================================================================
// Public result type
// ============================================================================

/// A reference video found for a keyword
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub published_at: String,
    pub platform: String,
    pub duration: Option<String>,
    pub channel_name: String,
}

impl From<VideoItem> for VideoInfo {
    fn from(item: VideoItem) -> Self {
        let thumbnails = item.snippet.thumbnails;
        let thumbnail_url = thumbnails
            .high
            .or(thumbnails.medium)
            .or(thumbnails.default)
            .map(|t| t.url);

        VideoInfo {
            url: format!("https://www.youtube.com/watch?v={}", item.id),
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail_url,
            view_count: parse_count(item.statistics.view_count.as_deref()),
            like_count: parse_count(item.statistics.like_count.as_deref()),
            published_at: item.snippet.published_at,
            platform: "youtube".to_string(),
            duration: item.content_details.map(|d| d.duration),
            channel_name: item.snippet.channel_title,
        }
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

// ============================================================================
// YouTube Client Implementation
// ============================================================================

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
        }
    }

    /// Short videos for `keyword`, most viewed first, with statistics.
    pub async fn search_videos(
        &self,
        keyword: &str,
        max_results: u32,
    ) -> Result<Vec<VideoInfo>, Box<dyn std::error::Error + Send + Sync>> {
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("q", keyword),
                ("type", "video"),
                ("videoDuration", "short"),
                ("order", "viewCount"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Failed to search videos: {}", error_text).into());
        }

        let search: SearchResponse = response.json().await?;
        let video_ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = video_ids.join(",");
        let response = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("id", ids.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Failed to get video details: {}", error_text).into());
        }

        let videos: VideoListResponse = response.json().await?;
        Ok(videos.items.into_iter().map(VideoInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_item_maps_to_video_info() {
        let item: VideoItem = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "snippet": {
                "title": "Cooking basics",
                "description": "How to boil an egg",
                "channelTitle": "Kitchen",
                "publishedAt": "2024-01-02T03:04:05Z",
                "thumbnails": {"medium": {"url": "https://i.ytimg.com/m.jpg"}}
            },
            "statistics": {"viewCount": "1200"},
            "contentDetails": {"duration": "PT45S"}
        }))
        .unwrap();

        let info = VideoInfo::from(item);
        assert_eq!(info.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(info.thumbnail_url.as_deref(), Some("https://i.ytimg.com/m.jpg"));
        assert_eq!(info.view_count, 1200);
        assert_eq!(info.like_count, 0);
        assert_eq!(info.duration.as_deref(), Some("PT45S"));
        assert_eq!(info.platform, "youtube");
    }

    #[test]
    fn search_items_without_video_ids_are_ignored() {
        let search: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [
                {"id": {"kind": "youtube#channel", "channelId": "c"}},
                {"id": {"kind": "youtube#video", "videoId": "v1"}}
            ]
        }))
        .unwrap();
        let ids: Vec<String> = search.items.into_iter().filter_map(|i| i.id.video_id).collect();
        assert_eq!(ids, vec!["v1".to_string()]);
    }
}

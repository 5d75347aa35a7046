// src/models/script.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::media::{MediaKind, MediaStatus};

/// Script lifecycle status (matches the `script_status` database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "script_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    Draft,
    Processing,
    Completed,
    Failed,
    Archived,
    Active,
}

impl ScriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStatus::Draft => "draft",
            ScriptStatus::Processing => "processing",
            ScriptStatus::Completed => "completed",
            ScriptStatus::Failed => "failed",
            ScriptStatus::Archived => "archived",
            ScriptStatus::Active => "active",
        }
    }

    /// Statuses a user may set by hand. The rest belong to the generation workflow.
    pub fn is_user_settable(&self) -> bool {
        matches!(
            self,
            ScriptStatus::Draft | ScriptStatus::Archived | ScriptStatus::Active
        )
    }
}

impl std::fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `video_scripts` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Script {
    pub id: Uuid,
    pub creator_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub total_duration: i32,
    pub status: ScriptStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row from the `scenes` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scene {
    pub id: Uuid,
    pub script_id: Uuid,
    pub scene_number: i32,
    pub description: String,
    pub duration: i32,
    pub visual_elements: String,
    pub background_music: Option<String>,
    pub voice_over: Option<String>,
    pub image_status: MediaStatus,
    pub voice_status: MediaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Scene {
    pub fn media_status(&self, kind: MediaKind) -> MediaStatus {
        match kind {
            MediaKind::Image => self.image_status,
            MediaKind::Voice => self.voice_status,
        }
    }

    /// Text fed to the generator for `kind`, if the scene has any.
    pub fn media_prompt(&self, kind: MediaKind) -> Option<&str> {
        let text = match kind {
            MediaKind::Image => Some(self.visual_elements.as_str()),
            MediaKind::Voice => self.voice_over.as_deref(),
        };
        text.map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Script together with its scenes in playback order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDetail {
    #[serde(flatten)]
    pub script: Script,
    pub scenes: Vec<Scene>,
}

/// Fields for inserting a new script
#[derive(Debug, Clone)]
pub struct NewScript {
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub total_duration: i32,
    pub creator_id: Option<Uuid>,
}

/// Fields for inserting a new scene. Both media statuses start out `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScene {
    pub scene_number: i32,
    pub description: String,
    pub duration: i32,
    pub visual_elements: String,
    pub background_music: Option<String>,
    pub voice_over: Option<String>,
}

/// Header fields rewritten when a script is enhanced
#[derive(Debug, Clone)]
pub struct ScriptHeader {
    pub title: String,
    pub description: String,
    pub total_duration: i32,
}

/// Partial update of a script. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub status: Option<ScriptStatus>,
    #[serde(skip)]
    pub creator_id: Option<Uuid>,
}

impl ScriptChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.target_audience.is_none()
            && self.status.is_none()
            && self.creator_id.is_none()
    }
}

/// Listing filter used by both the public listing and the project manager
#[derive(Debug, Clone)]
pub struct ScriptFilter {
    pub creator_id: Option<Uuid>,
    pub status: Option<ScriptStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for ScriptFilter {
    fn default() -> Self {
        Self {
            creator_id: None,
            status: None,
            skip: 0,
            limit: 100,
        }
    }
}

/// Request body for `POST /video-scripts/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScriptRequest {
    pub topic: String,
    pub target_audience: String,
    pub duration: i32,
}

/// Script skeleton returned by a script generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    pub total_duration: i32,
    #[serde(default)]
    pub scenes: Vec<GeneratedScene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedScene {
    pub scene_number: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: i32,
    #[serde(deserialize_with = "deserialize_visual_elements")]
    pub visual_elements: String,
    #[serde(default)]
    pub background_music: Option<String>,
    #[serde(default)]
    pub voice_over: Option<String>,
}

// Models sometimes answer with a list of visual cues instead of a paragraph.
fn deserialize_visual_elements<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum VisualElements {
        Text(String),
        List(Vec<String>),
    }

    Ok(match VisualElements::deserialize(deserializer)? {
        VisualElements::Text(text) => text,
        VisualElements::List(items) => items.join(", "),
    })
}

impl GeneratedScript {
    /// Order scenes by their proposed number and renumber them 1..n so that
    /// `scene_number` stays unique within the script.
    pub fn normalized_scenes(&self) -> Vec<NewScene> {
        let mut scenes: Vec<&GeneratedScene> = self.scenes.iter().collect();
        scenes.sort_by_key(|scene| scene.scene_number);

        scenes
            .into_iter()
            .enumerate()
            .map(|(index, scene)| NewScene {
                scene_number: index as i32 + 1,
                description: scene.description.trim().to_string(),
                duration: scene.duration.max(0),
                visual_elements: scene.visual_elements.trim().to_string(),
                background_music: non_empty(scene.background_music.as_deref()),
                voice_over: non_empty(scene.voice_over.as_deref()),
            })
            .collect()
    }

    pub fn header(&self) -> ScriptHeader {
        ScriptHeader {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            total_duration: self.total_duration.max(0),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(number: i32, visual: &str) -> GeneratedScene {
        GeneratedScene {
            scene_number: number,
            description: format!("scene {}", number),
            duration: 10,
            visual_elements: visual.to_string(),
            background_music: Some("  ".to_string()),
            voice_over: Some(format!("line {}", number)),
        }
    }

    #[test]
    fn normalized_scenes_are_renumbered_in_order() {
        let script = GeneratedScript {
            title: "t".into(),
            description: "d".into(),
            target_audience: None,
            total_duration: 30,
            scenes: vec![scene(5, "c"), scene(2, "a"), scene(2, "b")],
        };

        let scenes = script.normalized_scenes();
        let numbers: Vec<i32> = scenes.iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let visuals: Vec<&str> = scenes.iter().map(|s| s.visual_elements.as_str()).collect();
        assert_eq!(visuals, vec!["a", "b", "c"]);
        assert!(scenes.iter().all(|s| s.background_music.is_none()));
    }

    #[test]
    fn visual_elements_accepts_string_or_list() {
        let as_text: GeneratedScene = serde_json::from_str(
            r#"{"scene_number": 1, "description": "x", "duration": 5, "visual_elements": "a kitchen"}"#,
        )
        .unwrap();
        assert_eq!(as_text.visual_elements, "a kitchen");

        let as_list: GeneratedScene = serde_json::from_str(
            r#"{"scene_number": 1, "visual_elements": ["warm light", "wooden table"]}"#,
        )
        .unwrap();
        assert_eq!(as_list.visual_elements, "warm light, wooden table");
        assert_eq!(as_list.duration, 0);
    }

    #[test]
    fn only_lifecycle_statuses_are_user_settable() {
        assert!(ScriptStatus::Archived.is_user_settable());
        assert!(ScriptStatus::Active.is_user_settable());
        assert!(!ScriptStatus::Completed.is_user_settable());
        assert!(!ScriptStatus::Processing.is_user_settable());
    }
}

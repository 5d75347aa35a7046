// src/models/media.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-kind media lifecycle of a scene (matches the `media_status` database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "media_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MediaStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Completed | MediaStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Voice,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Voice => "voice",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `scene_images` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SceneImage {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub image_url: String,
    pub prompt: String,
    pub width: i32,
    pub height: i32,
    pub status: MediaStatus,
    pub created_at: DateTime<Utc>,
}

/// A row from the `voice_audios` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoiceAudio {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub audio_url: String,
    pub text_content: String,
    pub voice_id: String,
    pub speed: f64,
    pub status: MediaStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSceneImage {
    pub scene_id: Uuid,
    pub image_url: String,
    pub prompt: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone)]
pub struct NewVoiceAudio {
    pub scene_id: Uuid,
    pub audio_url: String,
    pub text_content: String,
    pub voice_id: String,
    pub speed: f64,
}

/// Image row joined with the number of the scene it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScriptImage {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub image: SceneImage,
    pub scene_number: i32,
}

/// Voice row joined with the number of the scene it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScriptVoice {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub voice: VoiceAudio,
    pub scene_number: i32,
}

/// A freshly generated artifact of either kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaArtifact {
    Image(SceneImage),
    Voice(VoiceAudio),
}

impl MediaArtifact {
    pub fn scene_id(&self) -> Uuid {
        match self {
            MediaArtifact::Image(image) => image.scene_id,
            MediaArtifact::Voice(voice) => voice.scene_id,
        }
    }
}

/// Optional generation parameters. Unset values fall back to configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaParams {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub voice_id: Option<String>,
    pub speed: Option<f64>,
}

/// Terminal status of one scene after a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMediaStatus {
    pub scene_id: Uuid,
    pub scene_number: i32,
    pub status: MediaStatus,
}

/// Result of `generate_media_for_script`: what succeeded and where it failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBatchReport {
    pub script_id: Uuid,
    pub kind: MediaKind,
    pub script_status: super::script::ScriptStatus,
    pub generated: Vec<MediaArtifact>,
    pub scenes: Vec<SceneMediaStatus>,
}

impl MediaBatchReport {
    pub fn failed_scene_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|scene| scene.status == MediaStatus::Failed)
            .count()
    }
}

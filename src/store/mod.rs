// src/store/mod.rs
//! Persistence for scripts, scenes and their generated artifacts.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    MediaKind, MediaStatus, NewScene, NewSceneImage, NewScript, NewVoiceAudio, Scene, SceneImage,
    Script, ScriptChanges, ScriptDetail, ScriptFilter, ScriptHeader, ScriptImage, ScriptStatus,
    ScriptVoice, VoiceAudio,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Every method commits on its own. Methods documented as atomic run in a
/// single transaction.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a script in `draft`.
    async fn create_script(&self, new: NewScript) -> Result<Script, StoreError>;

    /// Atomic: all scenes are inserted (media statuses `pending`) or none.
    async fn insert_scenes(
        &self,
        script_id: Uuid,
        scenes: &[NewScene],
    ) -> Result<Vec<Scene>, StoreError>;

    /// Atomic: rewrite the header, replace every scene (artifacts cascade) and
    /// reset the script to `draft`. `None` if the script does not exist.
    async fn rewrite_script(
        &self,
        script_id: Uuid,
        header: ScriptHeader,
        scenes: &[NewScene],
    ) -> Result<Option<ScriptDetail>, StoreError>;

    async fn get_script(&self, id: Uuid) -> Result<Option<Script>, StoreError>;

    async fn list_scripts(&self, filter: &ScriptFilter) -> Result<Vec<Script>, StoreError>;

    async fn update_script(
        &self,
        id: Uuid,
        changes: &ScriptChanges,
    ) -> Result<Option<Script>, StoreError>;

    /// Returns `false` if the script does not exist.
    async fn set_script_status(&self, id: Uuid, status: ScriptStatus) -> Result<bool, StoreError>;

    /// Deletes the script, its scenes and their artifacts.
    async fn delete_script(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Scenes ordered by `scene_number`.
    async fn list_scenes(&self, script_id: Uuid) -> Result<Vec<Scene>, StoreError>;

    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>, StoreError>;

    async fn set_media_status(
        &self,
        scene_id: Uuid,
        kind: MediaKind,
        status: MediaStatus,
    ) -> Result<(), StoreError>;

    /// Atomic: drop the scene's previous images, insert the new one, copy the
    /// prompt into `visual_elements` and mark `image_status` completed.
    async fn save_image(&self, new: NewSceneImage) -> Result<SceneImage, StoreError>;

    /// Atomic: drop the scene's previous voice rows, insert the new one, copy
    /// the text into `voice_over` and mark `voice_status` completed.
    async fn save_voice(&self, new: NewVoiceAudio) -> Result<VoiceAudio, StoreError>;

    async fn get_image(&self, id: Uuid) -> Result<Option<SceneImage>, StoreError>;

    async fn list_scene_images(&self, scene_id: Uuid) -> Result<Vec<SceneImage>, StoreError>;

    async fn list_scene_voices(&self, scene_id: Uuid) -> Result<Vec<VoiceAudio>, StoreError>;

    async fn list_script_images(&self, script_id: Uuid) -> Result<Vec<ScriptImage>, StoreError>;

    async fn list_script_voices(&self, script_id: Uuid) -> Result<Vec<ScriptVoice>, StoreError>;

    async fn get_script_detail(&self, id: Uuid) -> Result<Option<ScriptDetail>, StoreError> {
        let Some(script) = self.get_script(id).await? else {
            return Ok(None);
        };
        let scenes = self.list_scenes(id).await?;
        Ok(Some(ScriptDetail { script, scenes }))
    }
}

// src/store/memory.rs
//! In-process store with the same semantics as the Postgres schema
//! (cascading deletes, unique scene numbers, replace-on-save artifacts).
//! Used when no DATABASE_URL is configured and by the test suites.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ScriptStore, StoreError};
use crate::models::{
    MediaKind, MediaStatus, NewScene, NewSceneImage, NewScript, NewVoiceAudio, Scene, SceneImage,
    Script, ScriptChanges, ScriptDetail, ScriptFilter, ScriptHeader, ScriptImage, ScriptStatus,
    ScriptVoice, VoiceAudio,
};

#[derive(Default)]
struct Tables {
    scripts: HashMap<Uuid, Script>,
    scenes: HashMap<Uuid, Scene>,
    images: Vec<SceneImage>,
    voices: Vec<VoiceAudio>,
}

impl Tables {
    fn scenes_of(&self, script_id: Uuid) -> Vec<Scene> {
        let mut scenes: Vec<Scene> = self
            .scenes
            .values()
            .filter(|scene| scene.script_id == script_id)
            .cloned()
            .collect();
        scenes.sort_by_key(|scene| scene.scene_number);
        scenes
    }

    fn remove_scenes_of(&mut self, script_id: Uuid) {
        let doomed: Vec<Uuid> = self
            .scenes
            .values()
            .filter(|scene| scene.script_id == script_id)
            .map(|scene| scene.id)
            .collect();

        for scene_id in &doomed {
            self.scenes.remove(scene_id);
        }
        self.images.retain(|image| !doomed.contains(&image.scene_id));
        self.voices.retain(|voice| !doomed.contains(&voice.scene_id));
    }

    fn check_scene_numbers(&self, script_id: Uuid, scenes: &[NewScene]) -> Result<(), StoreError> {
        let mut taken: Vec<i32> = self
            .scenes
            .values()
            .filter(|scene| scene.script_id == script_id)
            .map(|scene| scene.scene_number)
            .collect();

        for scene in scenes {
            if taken.contains(&scene.scene_number) {
                return Err(StoreError::Constraint(format!(
                    "scene_number {} already exists for script {}",
                    scene.scene_number, script_id
                )));
            }
            taken.push(scene.scene_number);
        }
        Ok(())
    }

    fn push_scenes(&mut self, script_id: Uuid, scenes: &[NewScene]) -> Vec<Scene> {
        let now = Utc::now();
        scenes
            .iter()
            .map(|new| {
                let scene = Scene {
                    id: Uuid::new_v4(),
                    script_id,
                    scene_number: new.scene_number,
                    description: new.description.clone(),
                    duration: new.duration,
                    visual_elements: new.visual_elements.clone(),
                    background_music: new.background_music.clone(),
                    voice_over: new.voice_over.clone(),
                    image_status: MediaStatus::Pending,
                    voice_status: MediaStatus::Pending,
                    created_at: now,
                    updated_at: None,
                };
                self.scenes.insert(scene.id, scene.clone());
                scene
            })
            .collect()
    }

    fn scene_number(&self, scene_id: Uuid) -> Option<i32> {
        self.scenes.get(&scene_id).map(|scene| scene.scene_number)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    reject_scene_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_scenes` fail, for exercising partial-creation paths.
    pub fn reject_scene_inserts(&self, reject: bool) {
        self.reject_scene_inserts.store(reject, Ordering::SeqCst);
    }

    pub async fn scene_count(&self) -> usize {
        self.tables.read().await.scenes.len()
    }

    pub async fn artifact_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.images.len() + tables.voices.len()
    }
}

#[async_trait]
impl ScriptStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_script(&self, new: NewScript) -> Result<Script, StoreError> {
        let script = Script {
            id: Uuid::new_v4(),
            creator_id: new.creator_id,
            title: new.title,
            description: new.description,
            target_audience: new.target_audience,
            total_duration: new.total_duration,
            status: ScriptStatus::Draft,
            version: 1,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.tables
            .write()
            .await
            .scripts
            .insert(script.id, script.clone());
        Ok(script)
    }

    async fn insert_scenes(
        &self,
        script_id: Uuid,
        scenes: &[NewScene],
    ) -> Result<Vec<Scene>, StoreError> {
        if self.reject_scene_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Constraint("scene inserts rejected".to_string()));
        }

        let mut tables = self.tables.write().await;
        if !tables.scripts.contains_key(&script_id) {
            return Err(StoreError::Constraint(format!(
                "script {} does not exist",
                script_id
            )));
        }
        tables.check_scene_numbers(script_id, scenes)?;

        Ok(tables.push_scenes(script_id, scenes))
    }

    async fn rewrite_script(
        &self,
        script_id: Uuid,
        header: ScriptHeader,
        scenes: &[NewScene],
    ) -> Result<Option<ScriptDetail>, StoreError> {
        let mut tables = self.tables.write().await;

        let script = match tables.scripts.get_mut(&script_id) {
            Some(script) => {
                script.title = header.title;
                script.description = header.description;
                script.total_duration = header.total_duration;
                script.status = ScriptStatus::Draft;
                script.version += 1;
                script.updated_at = Some(Utc::now());
                script.clone()
            }
            None => return Ok(None),
        };

        tables.remove_scenes_of(script_id);
        tables.check_scene_numbers(script_id, scenes)?;
        let scenes = tables.push_scenes(script_id, scenes);

        Ok(Some(ScriptDetail { script, scenes }))
    }

    async fn get_script(&self, id: Uuid) -> Result<Option<Script>, StoreError> {
        Ok(self.tables.read().await.scripts.get(&id).cloned())
    }

    async fn list_scripts(&self, filter: &ScriptFilter) -> Result<Vec<Script>, StoreError> {
        let tables = self.tables.read().await;

        let mut scripts: Vec<Script> = tables
            .scripts
            .values()
            .filter(|script| filter.creator_id.map_or(true, |id| script.creator_id == Some(id)))
            .filter(|script| filter.status.map_or(true, |status| script.status == status))
            .cloned()
            .collect();

        scripts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(scripts
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update_script(
        &self,
        id: Uuid,
        changes: &ScriptChanges,
    ) -> Result<Option<Script>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(script) = tables.scripts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            script.title = title.clone();
        }
        if let Some(description) = &changes.description {
            script.description = description.clone();
        }
        if let Some(audience) = &changes.target_audience {
            script.target_audience = audience.clone();
        }
        if let Some(status) = changes.status {
            script.status = status;
        }
        if let Some(creator_id) = changes.creator_id {
            script.creator_id = Some(creator_id);
        }
        script.version += 1;
        script.updated_at = Some(Utc::now());

        Ok(Some(script.clone()))
    }

    async fn set_script_status(&self, id: Uuid, status: ScriptStatus) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.scripts.get_mut(&id) {
            Some(script) => {
                script.status = status;
                script.version += 1;
                script.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_script(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.scripts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_scenes_of(id);
        Ok(true)
    }

    async fn list_scenes(&self, script_id: Uuid) -> Result<Vec<Scene>, StoreError> {
        Ok(self.tables.read().await.scenes_of(script_id))
    }

    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>, StoreError> {
        Ok(self.tables.read().await.scenes.get(&id).cloned())
    }

    async fn set_media_status(
        &self,
        scene_id: Uuid,
        kind: MediaKind,
        status: MediaStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(scene) = tables.scenes.get_mut(&scene_id) {
            match kind {
                MediaKind::Image => scene.image_status = status,
                MediaKind::Voice => scene.voice_status = status,
            }
            scene.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn save_image(&self, new: NewSceneImage) -> Result<SceneImage, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(scene) = tables.scenes.get_mut(&new.scene_id) else {
            return Err(StoreError::Constraint(format!(
                "scene {} does not exist",
                new.scene_id
            )));
        };
        scene.image_status = MediaStatus::Completed;
        scene.visual_elements = new.prompt.clone();
        scene.updated_at = Some(Utc::now());

        let image = SceneImage {
            id: Uuid::new_v4(),
            scene_id: new.scene_id,
            image_url: new.image_url,
            prompt: new.prompt,
            width: new.width,
            height: new.height,
            status: MediaStatus::Completed,
            created_at: Utc::now(),
        };
        tables.images.retain(|existing| existing.scene_id != new.scene_id);
        tables.images.push(image.clone());
        Ok(image)
    }

    async fn save_voice(&self, new: NewVoiceAudio) -> Result<VoiceAudio, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(scene) = tables.scenes.get_mut(&new.scene_id) else {
            return Err(StoreError::Constraint(format!(
                "scene {} does not exist",
                new.scene_id
            )));
        };
        scene.voice_status = MediaStatus::Completed;
        scene.voice_over = Some(new.text_content.clone());
        scene.updated_at = Some(Utc::now());

        let voice = VoiceAudio {
            id: Uuid::new_v4(),
            scene_id: new.scene_id,
            audio_url: new.audio_url,
            text_content: new.text_content,
            voice_id: new.voice_id,
            speed: new.speed,
            status: MediaStatus::Completed,
            created_at: Utc::now(),
        };
        tables.voices.retain(|existing| existing.scene_id != new.scene_id);
        tables.voices.push(voice.clone());
        Ok(voice)
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<SceneImage>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.images.iter().find(|image| image.id == id).cloned())
    }

    async fn list_scene_images(&self, scene_id: Uuid) -> Result<Vec<SceneImage>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .images
            .iter()
            .filter(|image| image.scene_id == scene_id)
            .cloned()
            .collect())
    }

    async fn list_scene_voices(&self, scene_id: Uuid) -> Result<Vec<VoiceAudio>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .voices
            .iter()
            .filter(|voice| voice.scene_id == scene_id)
            .cloned()
            .collect())
    }

    async fn list_script_images(&self, script_id: Uuid) -> Result<Vec<ScriptImage>, StoreError> {
        let tables = self.tables.read().await;
        let mut images: Vec<ScriptImage> = tables
            .images
            .iter()
            .filter(|image| {
                tables
                    .scenes
                    .get(&image.scene_id)
                    .is_some_and(|scene| scene.script_id == script_id)
            })
            .filter_map(|image| {
                tables.scene_number(image.scene_id).map(|scene_number| ScriptImage {
                    image: image.clone(),
                    scene_number,
                })
            })
            .collect();
        images.sort_by_key(|entry| entry.scene_number);
        Ok(images)
    }

    async fn list_script_voices(&self, script_id: Uuid) -> Result<Vec<ScriptVoice>, StoreError> {
        let tables = self.tables.read().await;
        let mut voices: Vec<ScriptVoice> = tables
            .voices
            .iter()
            .filter(|voice| {
                tables
                    .scenes
                    .get(&voice.scene_id)
                    .is_some_and(|scene| scene.script_id == script_id)
            })
            .filter_map(|voice| {
                tables.scene_number(voice.scene_id).map(|scene_number| ScriptVoice {
                    voice: voice.clone(),
                    scene_number,
                })
            })
            .collect();
        voices.sort_by_key(|entry| entry.scene_number);
        Ok(voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_scene(number: i32) -> NewScene {
        NewScene {
            scene_number: number,
            description: format!("scene {}", number),
            duration: 10,
            visual_elements: format!("visual {}", number),
            background_music: None,
            voice_over: Some(format!("voice {}", number)),
        }
    }

    async fn seeded_store() -> (InMemoryStore, Script, Vec<Scene>) {
        let store = InMemoryStore::new();
        let script = store
            .create_script(NewScript {
                title: "title".into(),
                description: "desc".into(),
                target_audience: "everyone".into(),
                total_duration: 30,
                creator_id: None,
            })
            .await
            .unwrap();
        let scenes = store
            .insert_scenes(script.id, &[new_scene(1), new_scene(2)])
            .await
            .unwrap();
        (store, script, scenes)
    }

    #[tokio::test]
    async fn delete_cascades_to_scenes_and_artifacts() {
        let (store, script, scenes) = seeded_store().await;
        store
            .save_image(NewSceneImage {
                scene_id: scenes[0].id,
                image_url: "https://img/1.png".into(),
                prompt: "visual 1".into(),
                width: 1024,
                height: 768,
            })
            .await
            .unwrap();
        store
            .save_voice(NewVoiceAudio {
                scene_id: scenes[1].id,
                audio_url: "data:audio/mpeg;base64,AAAA".into(),
                text_content: "voice 2".into(),
                voice_id: "vi-VN-Wavenet-A".into(),
                speed: 1.0,
            })
            .await
            .unwrap();
        assert_eq!(store.artifact_count().await, 2);

        assert!(store.delete_script(script.id).await.unwrap());

        assert_eq!(store.scene_count().await, 0);
        assert_eq!(store.artifact_count().await, 0);
        assert!(!store.delete_script(script.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_scene_numbers_are_rejected_without_partial_insert() {
        let (store, script, _) = seeded_store().await;

        let err = store
            .insert_scenes(script.id, &[new_scene(3), new_scene(2)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.list_scenes(script.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn save_image_replaces_previous_rows_and_completes_scene() {
        let (store, _, scenes) = seeded_store().await;
        let scene_id = scenes[0].id;

        for url in ["https://img/a.png", "https://img/b.png"] {
            store
                .save_image(NewSceneImage {
                    scene_id,
                    image_url: url.into(),
                    prompt: "new prompt".into(),
                    width: 512,
                    height: 512,
                })
                .await
                .unwrap();
        }

        let images = store.list_scene_images(scene_id).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_url, "https://img/b.png");

        let scene = store.get_scene(scene_id).await.unwrap().unwrap();
        assert_eq!(scene.image_status, MediaStatus::Completed);
        assert_eq!(scene.visual_elements, "new prompt");
    }

    #[tokio::test]
    async fn list_scripts_filters_by_creator_and_status() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();

        for (creator, status) in [
            (Some(owner), ScriptStatus::Archived),
            (Some(owner), ScriptStatus::Draft),
            (None, ScriptStatus::Archived),
        ] {
            let script = store
                .create_script(NewScript {
                    title: "t".into(),
                    description: String::new(),
                    target_audience: String::new(),
                    total_duration: 10,
                    creator_id: creator,
                })
                .await
                .unwrap();
            store.set_script_status(script.id, status).await.unwrap();
        }

        let filter = ScriptFilter {
            creator_id: Some(owner),
            status: Some(ScriptStatus::Archived),
            ..ScriptFilter::default()
        };
        let scripts = store.list_scripts(&filter).await.unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].creator_id, Some(owner));

        let all_owned = ScriptFilter {
            creator_id: Some(owner),
            ..ScriptFilter::default()
        };
        assert_eq!(store.list_scripts(&all_owned).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn every_write_bumps_the_version() {
        let (store, script, _) = seeded_store().await;
        store
            .set_script_status(script.id, ScriptStatus::Processing)
            .await
            .unwrap();
        let updated = store
            .update_script(
                script.id,
                &ScriptChanges {
                    title: Some("renamed".into()),
                    ..ScriptChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, script.version + 2);
        assert_eq!(updated.title, "renamed");
    }
}

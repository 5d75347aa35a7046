// src/workflow/coordinator.rs
//! Drives script generation and per-scene media generation while keeping
//! every scene and script in a well-defined status, even on partial failure.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use super::aggregate::aggregate_script_status;
use super::locks::{ScriptGuard, ScriptLocks};
use crate::error::{AppError, AppResult};
use crate::generators::{GenerationError, ImageGenerator, ScriptGenerator, VoiceGenerator};
use crate::models::{
    CreateScriptRequest, GeneratedScript, MediaArtifact, MediaBatchReport, MediaKind, MediaParams,
    MediaStatus, NewScene, NewSceneImage, NewScript, NewVoiceAudio, Scene, SceneImage,
    SceneMediaStatus, Script, ScriptChanges, ScriptDetail, ScriptStatus,
};
use crate::store::{ScriptStore, StoreError};

pub const MAX_SCRIPT_DURATION: i32 = 3600;
pub const MIN_IMAGE_SIDE: i32 = 64;
pub const MAX_IMAGE_SIDE: i32 = 2048;
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub default_width: i32,
    pub default_height: i32,
    pub default_voice_id: String,
    pub default_speed: f64,
    /// Scenes generated at once within one batch.
    pub media_concurrency: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            default_width: 1024,
            default_height: 768,
            default_voice_id: crate::config::DEFAULT_VOICE_ID.to_string(),
            default_speed: 1.0,
            media_concurrency: 1,
        }
    }
}

/// `MediaParams` with defaults filled in and ranges checked
#[derive(Debug, Clone)]
struct ResolvedParams {
    width: i32,
    height: i32,
    voice_id: String,
    speed: f64,
}

pub struct WorkflowCoordinator {
    store: Arc<dyn ScriptStore>,
    script_generator: Arc<dyn ScriptGenerator>,
    image_generator: Arc<dyn ImageGenerator>,
    voice_generator: Arc<dyn VoiceGenerator>,
    locks: ScriptLocks,
    settings: CoordinatorSettings,
}

impl WorkflowCoordinator {
    pub fn new(
        store: Arc<dyn ScriptStore>,
        script_generator: Arc<dyn ScriptGenerator>,
        image_generator: Arc<dyn ImageGenerator>,
        voice_generator: Arc<dyn VoiceGenerator>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            store,
            script_generator,
            image_generator,
            voice_generator,
            locks: ScriptLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn ScriptStore> {
        &self.store
    }

    pub fn script_generator_name(&self) -> &'static str {
        self.script_generator.name()
    }

    pub fn image_generation_enabled(&self) -> bool {
        self.image_generator.is_configured()
    }

    pub fn voice_generation_enabled(&self) -> bool {
        self.voice_generator.is_configured()
    }

    fn lock(&self, script_id: Uuid) -> AppResult<ScriptGuard> {
        self.locks.try_acquire(script_id).ok_or_else(|| {
            AppError::Conflict(format!(
                "Script {} is being modified by another operation",
                script_id
            ))
        })
    }

    /// Check `params` against the allowed ranges without generating anything.
    pub fn validate_params(&self, params: &MediaParams) -> AppResult<()> {
        self.resolve_params(params).map(|_| ())
    }

    fn resolve_params(&self, params: &MediaParams) -> AppResult<ResolvedParams> {
        let width = params.width.unwrap_or(self.settings.default_width);
        let height = params.height.unwrap_or(self.settings.default_height);
        for (name, side) in [("width", width), ("height", height)] {
            if !(MIN_IMAGE_SIDE..=MAX_IMAGE_SIDE).contains(&side) {
                return Err(AppError::Validation(format!(
                    "{} must be between {} and {}",
                    name, MIN_IMAGE_SIDE, MAX_IMAGE_SIDE
                )));
            }
        }

        let speed = params.speed.unwrap_or(self.settings.default_speed);
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(AppError::Validation(format!(
                "speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            )));
        }

        let voice_id = match params.voice_id.as_deref().map(str::trim) {
            Some("") => return Err(AppError::Validation("voice_id must not be empty".into())),
            Some(voice_id) => voice_id.to_string(),
            None => self.settings.default_voice_id.clone(),
        };

        Ok(ResolvedParams {
            width,
            height,
            voice_id,
            speed,
        })
    }

    // ------------------------------------------------------------------
    // Scripts
    // ------------------------------------------------------------------

    /// Generate a script and persist it in `draft` with all of its scenes
    /// `pending`. A generator failure persists nothing. A failure while
    /// inserting scenes leaves the script behind as a `failed` marker.
    pub async fn generate_script(
        &self,
        request: &CreateScriptRequest,
        creator_id: Option<Uuid>,
    ) -> AppResult<ScriptDetail> {
        let topic = request.topic.trim();
        let audience = request.target_audience.trim();
        if topic.is_empty() {
            return Err(AppError::Validation("topic must not be empty".into()));
        }
        if audience.is_empty() {
            return Err(AppError::Validation("target_audience must not be empty".into()));
        }
        if !(1..=MAX_SCRIPT_DURATION).contains(&request.duration) {
            return Err(AppError::Validation(format!(
                "duration must be between 1 and {} seconds",
                MAX_SCRIPT_DURATION
            )));
        }

        tracing::info!(
            "🎬 Generating script via {} (topic: {}, audience: {}, duration: {}s)",
            self.script_generator.name(),
            topic,
            audience,
            request.duration
        );

        let generated = self
            .script_generator
            .generate(topic, audience, request.duration)
            .await?;
        let scenes = scenes_of(&generated)?;
        let header = generated.header();

        let target_audience = generated
            .target_audience
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(audience)
            .to_string();

        let script = self
            .store
            .create_script(NewScript {
                title: non_blank_or(header.title, topic),
                description: header.description,
                target_audience,
                total_duration: if header.total_duration > 0 {
                    header.total_duration
                } else {
                    request.duration
                },
                creator_id,
            })
            .await?;

        match self.store.insert_scenes(script.id, &scenes).await {
            Ok(scenes) => {
                tracing::info!("✅ Script {} created with {} scenes", script.id, scenes.len());
                Ok(ScriptDetail { script, scenes })
            }
            Err(e) => {
                tracing::error!("❌ Failed to store scenes for script {}: {}", script.id, e);
                self.mark_script_failed(script.id).await;
                Err(e.into())
            }
        }
    }

    /// Ask the script generator for an improved version and replace the
    /// script's header and scenes in one step. The script returns to `draft`.
    pub async fn enhance_script(&self, script_id: Uuid) -> AppResult<ScriptDetail> {
        let _guard = self.lock(script_id)?;

        let detail = self
            .store
            .get_script_detail(script_id)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))?;

        let enhanced = self.script_generator.enhance(&detail).await?;
        let scenes = scenes_of(&enhanced)?;
        let mut header = enhanced.header();
        header.title = non_blank_or(header.title, &detail.script.title);
        if header.total_duration == 0 {
            header.total_duration = detail.script.total_duration;
        }

        let rewritten = self
            .store
            .rewrite_script(script_id, header, &scenes)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))?;

        tracing::info!(
            "✅ Script {} enhanced ({} scenes)",
            script_id,
            rewritten.scenes.len()
        );
        Ok(rewritten)
    }

    pub async fn update_script(&self, script_id: Uuid, changes: &ScriptChanges) -> AppResult<Script> {
        if changes.is_empty() {
            return Err(AppError::Validation("No fields to update".into()));
        }
        if let Some(status) = changes.status {
            if !status.is_user_settable() {
                return Err(AppError::Validation(format!(
                    "Status '{}' cannot be set manually",
                    status
                )));
            }
        }
        if changes.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::Validation("title must not be empty".into()));
        }

        let _guard = self.lock(script_id)?;
        self.store
            .update_script(script_id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))
    }

    /// Assign an unowned script to `user_id`.
    pub async fn save_script(&self, script_id: Uuid, user_id: Uuid) -> AppResult<Script> {
        let _guard = self.lock(script_id)?;

        let script = self
            .store
            .get_script(script_id)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))?;
        if script.creator_id.is_some() {
            return Err(AppError::Validation(
                "Script is already saved to a user".into(),
            ));
        }

        let changes = ScriptChanges {
            creator_id: Some(user_id),
            ..ScriptChanges::default()
        };
        self.store
            .update_script(script_id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))
    }

    pub async fn archive_script(&self, script_id: Uuid) -> AppResult<Script> {
        let _guard = self.lock(script_id)?;
        self.set_status(script_id, ScriptStatus::Archived).await
    }

    /// Only archived scripts can be restored; they come back `active`.
    pub async fn restore_script(&self, script_id: Uuid) -> AppResult<Script> {
        let _guard = self.lock(script_id)?;

        let script = self
            .store
            .get_script(script_id)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))?;
        if script.status != ScriptStatus::Archived {
            return Err(AppError::Validation(format!(
                "Only archived scripts can be restored (current status: {})",
                script.status
            )));
        }

        self.set_status(script_id, ScriptStatus::Active).await
    }

    pub async fn delete_script(&self, script_id: Uuid) -> AppResult<()> {
        let _guard = self.lock(script_id)?;
        if !self.store.delete_script(script_id).await? {
            return Err(AppError::not_found("Script", script_id));
        }
        tracing::info!("🗑️ Script {} deleted with its scenes and media", script_id);
        Ok(())
    }

    async fn set_status(&self, script_id: Uuid, status: ScriptStatus) -> AppResult<Script> {
        if !self.store.set_script_status(script_id, status).await? {
            return Err(AppError::not_found("Script", script_id));
        }
        self.store
            .get_script(script_id)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))
    }

    async fn mark_script_failed(&self, script_id: Uuid) {
        if let Err(e) = self
            .store
            .set_script_status(script_id, ScriptStatus::Failed)
            .await
        {
            tracing::error!("❌ Could not mark script {} as failed: {}", script_id, e);
        }
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    /// Generate `kind` media for every scene that does not have it yet.
    ///
    /// A failing scene is marked `failed` and the batch moves on. Afterwards
    /// the script status is recomputed from the scenes.
    pub async fn generate_media_for_script(
        &self,
        script_id: Uuid,
        kind: MediaKind,
        params: &MediaParams,
    ) -> AppResult<MediaBatchReport> {
        let resolved = self.resolve_params(params)?;
        let guard = self.lock(script_id)?;

        let detail = self
            .store
            .get_script_detail(script_id)
            .await?
            .ok_or_else(|| AppError::not_found("Script", script_id))?;

        let run = InterruptedRun::new(self.store.clone(), script_id, kind, guard);
        self.store
            .set_script_status(script_id, ScriptStatus::Processing)
            .await?;

        let outcome = self.run_batch(&detail, kind, &resolved).await;
        if let Err(e) = &outcome {
            tracing::error!("❌ {} batch for script {} aborted: {}", kind, script_id, e);
            if let Err(e) = fail_processing_scenes(self.store.as_ref(), script_id, kind).await {
                tracing::error!("❌ Could not fail unfinished scenes of {}: {}", script_id, e);
            }
            self.mark_script_failed(script_id).await;
        }
        run.complete();
        outcome
    }

    async fn run_batch(
        &self,
        detail: &ScriptDetail,
        kind: MediaKind,
        params: &ResolvedParams,
    ) -> AppResult<MediaBatchReport> {
        let script_id = detail.script.id;
        let pending: Vec<&Scene> = detail
            .scenes
            .iter()
            .filter(|scene| scene.media_status(kind) != MediaStatus::Completed)
            .collect();

        tracing::info!(
            "🎬 Generating {} for script {}: {} of {} scenes pending",
            kind,
            script_id,
            pending.len(),
            detail.scenes.len()
        );

        // Results come back in scene_number order whatever the concurrency.
        let tasks: Vec<_> = pending
            .into_iter()
            .map(|scene| self.process_scene(scene, kind, params))
            .collect();
        let outcomes: Vec<Result<Option<MediaArtifact>, StoreError>> = stream::iter(tasks)
            .buffered(self.settings.media_concurrency.max(1))
            .collect()
            .await;

        let mut generated = Vec::new();
        for outcome in outcomes {
            if let Some(artifact) = outcome? {
                generated.push(artifact);
            }
        }

        let scenes = self.store.list_scenes(script_id).await?;
        let script_status = self.reaggregate_with(script_id, kind, &scenes).await?;

        let report = MediaBatchReport {
            script_id,
            kind,
            script_status,
            generated,
            scenes: scenes
                .iter()
                .map(|scene| SceneMediaStatus {
                    scene_id: scene.id,
                    scene_number: scene.scene_number,
                    status: scene.media_status(kind),
                })
                .collect(),
        };

        tracing::info!(
            "✅ {} batch for script {} finished: {} generated, {} failed, script {}",
            kind,
            script_id,
            report.generated.len(),
            report.failed_scene_count(),
            script_status
        );
        Ok(report)
    }

    /// One scene of a batch. Generator failures are recorded on the scene and
    /// yield `Ok(None)`; only status writes that cannot be made are errors.
    async fn process_scene(
        &self,
        scene: &Scene,
        kind: MediaKind,
        params: &ResolvedParams,
    ) -> Result<Option<MediaArtifact>, StoreError> {
        self.store
            .set_media_status(scene.id, kind, MediaStatus::Processing)
            .await?;

        let Some(prompt) = scene.media_prompt(kind) else {
            tracing::warn!(
                "Scene {} (#{}) has no {} prompt, marking failed",
                scene.id,
                scene.scene_number,
                kind
            );
            self.store
                .set_media_status(scene.id, kind, MediaStatus::Failed)
                .await?;
            return Ok(None);
        };

        match self.produce(scene.id, kind, prompt, params).await {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) => {
                tracing::warn!(
                    "⚠️ {} generation failed for scene {} (#{}): {}",
                    kind,
                    scene.id,
                    scene.scene_number,
                    e
                );
                self.store
                    .set_media_status(scene.id, kind, MediaStatus::Failed)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Call the generator and persist the artifact (replacing older ones).
    async fn produce(
        &self,
        scene_id: Uuid,
        kind: MediaKind,
        prompt: &str,
        params: &ResolvedParams,
    ) -> AppResult<MediaArtifact> {
        match kind {
            MediaKind::Image => {
                let image_url = self
                    .image_generator
                    .generate(prompt, params.width, params.height)
                    .await
                    .ok_or_else(|| {
                        GenerationError::Failed("image generator returned no image".into())
                    })?;

                let image = self
                    .store
                    .save_image(NewSceneImage {
                        scene_id,
                        image_url,
                        prompt: prompt.to_string(),
                        width: params.width,
                        height: params.height,
                    })
                    .await?;
                Ok(MediaArtifact::Image(image))
            }
            MediaKind::Voice => {
                let audio_url = self
                    .voice_generator
                    .generate(prompt, &params.voice_id, params.speed)
                    .await?;

                let voice = self
                    .store
                    .save_voice(NewVoiceAudio {
                        scene_id,
                        audio_url,
                        text_content: prompt.to_string(),
                        voice_id: params.voice_id.clone(),
                        speed: params.speed,
                    })
                    .await?;
                Ok(MediaArtifact::Voice(voice))
            }
        }
    }

    /// Regenerate one scene's `kind` artifact, replacing the previous one.
    ///
    /// `text` replaces the scene's prompt (`visual_elements` or `voice_over`);
    /// `None` reuses the current one. The owning script is re-aggregated
    /// for `kind` whether or not generation succeeds.
    pub async fn update_media(
        &self,
        scene_id: Uuid,
        kind: MediaKind,
        text: Option<&str>,
        params: &MediaParams,
    ) -> AppResult<MediaArtifact> {
        let resolved = self.resolve_params(params)?;

        let scene = self
            .store
            .get_scene(scene_id)
            .await?
            .ok_or_else(|| AppError::not_found("Scene", scene_id))?;
        let guard = self.lock(scene.script_id)?;

        let prompt = match text.map(str::trim) {
            Some("") => {
                return Err(AppError::Validation(format!("{} text must not be empty", kind)))
            }
            Some(text) => text.to_string(),
            None => scene
                .media_prompt(kind)
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::Validation(format!("Scene {} has no {} text", scene_id, kind))
                })?,
        };

        let run = InterruptedRun::new(self.store.clone(), scene.script_id, kind, guard);
        self.store
            .set_script_status(scene.script_id, ScriptStatus::Processing)
            .await?;

        let outcome = self.regenerate(&scene, kind, &prompt, &resolved).await;

        if outcome.is_err() {
            if let Err(e) = self
                .store
                .set_media_status(scene_id, kind, MediaStatus::Failed)
                .await
            {
                tracing::error!("❌ Could not mark scene {} as failed: {}", scene_id, e);
            }
        }

        match self.store.list_scenes(scene.script_id).await {
            Ok(scenes) => {
                if let Err(e) = self.reaggregate_with(scene.script_id, kind, &scenes).await {
                    tracing::error!("❌ Could not update script {} status: {}", scene.script_id, e);
                    self.mark_script_failed(scene.script_id).await;
                }
            }
            Err(e) => {
                tracing::error!("❌ Could not reload scenes of script {}: {}", scene.script_id, e);
                self.mark_script_failed(scene.script_id).await;
            }
        }

        run.complete();
        outcome
    }

    async fn regenerate(
        &self,
        scene: &Scene,
        kind: MediaKind,
        prompt: &str,
        params: &ResolvedParams,
    ) -> AppResult<MediaArtifact> {
        self.store
            .set_media_status(scene.id, kind, MediaStatus::Processing)
            .await?;

        let artifact = self.produce(scene.id, kind, prompt, params).await?;
        tracing::info!("✅ {} regenerated for scene {} (#{})", kind, scene.id, scene.scene_number);
        Ok(artifact)
    }

    /// Regenerate the scene owning `image_id` with a new prompt and size.
    /// Omitted dimensions keep the current image's size.
    pub async fn update_scene_image(
        &self,
        image_id: Uuid,
        prompt: Option<&str>,
        params: &MediaParams,
    ) -> AppResult<SceneImage> {
        let image = self
            .store
            .get_image(image_id)
            .await?
            .ok_or_else(|| AppError::not_found("Image", image_id))?;

        let params = MediaParams {
            width: params.width.or(Some(image.width)),
            height: params.height.or(Some(image.height)),
            ..params.clone()
        };

        match self
            .update_media(image.scene_id, MediaKind::Image, prompt, &params)
            .await?
        {
            MediaArtifact::Image(image) => Ok(image),
            MediaArtifact::Voice(_) => Err(AppError::Generation(GenerationError::Failed(
                "expected an image artifact".into(),
            ))),
        }
    }

    /// Synthesize speech without storing anything.
    pub async fn preview_voice(
        &self,
        text: &str,
        voice_id: Option<&str>,
        speed: Option<f64>,
    ) -> AppResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("text must not be empty".into()));
        }
        let params = self.resolve_params(&MediaParams {
            voice_id: voice_id.map(str::to_string),
            speed,
            ..MediaParams::default()
        })?;

        Ok(self
            .voice_generator
            .generate(text, &params.voice_id, params.speed)
            .await?)
    }

    async fn reaggregate_with(
        &self,
        script_id: Uuid,
        kind: MediaKind,
        scenes: &[Scene],
    ) -> AppResult<ScriptStatus> {
        let statuses: Vec<MediaStatus> = scenes.iter().map(|scene| scene.media_status(kind)).collect();
        let status = aggregate_script_status(&statuses);
        self.store.set_script_status(script_id, status).await?;
        Ok(status)
    }
}

/// Cleanup for a media run whose future is dropped before it finishes, for
/// example when the client disconnects. Scenes left `processing` become
/// `failed` and the script is re-aggregated on a spawned task, which keeps
/// the script lock until it is done.
struct InterruptedRun {
    store: Arc<dyn ScriptStore>,
    script_id: Uuid,
    kind: MediaKind,
    lock: Option<ScriptGuard>,
    armed: bool,
}

impl InterruptedRun {
    fn new(store: Arc<dyn ScriptStore>, script_id: Uuid, kind: MediaKind, lock: ScriptGuard) -> Self {
        Self {
            store,
            script_id,
            kind,
            lock: Some(lock),
            armed: true,
        }
    }

    /// The run reached a terminal state on its own; just release the lock.
    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptedRun {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let (script_id, kind) = (self.script_id, self.kind);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                "❌ {} run for script {} interrupted outside a runtime, statuses left as is",
                kind,
                script_id
            );
            return;
        };

        tracing::warn!(
            "⚠️ {} run for script {} was interrupted, failing unfinished scenes",
            kind,
            script_id
        );
        let store = self.store.clone();
        let lock = self.lock.take();
        handle.spawn(async move {
            let _lock = lock;
            let recovered = match fail_processing_scenes(store.as_ref(), script_id, kind).await {
                Ok(()) => reaggregate(store.as_ref(), script_id, kind).await,
                Err(e) => Err(e),
            };
            if let Err(e) = recovered {
                tracing::error!("❌ Recovery of script {} failed: {}", script_id, e);
                if let Err(e) = store.set_script_status(script_id, ScriptStatus::Failed).await {
                    tracing::error!("❌ Could not mark script {} as failed: {}", script_id, e);
                }
            }
        });
    }
}

async fn fail_processing_scenes(
    store: &dyn ScriptStore,
    script_id: Uuid,
    kind: MediaKind,
) -> Result<(), StoreError> {
    for scene in store.list_scenes(script_id).await? {
        if scene.media_status(kind) == MediaStatus::Processing {
            store
                .set_media_status(scene.id, kind, MediaStatus::Failed)
                .await?;
        }
    }
    Ok(())
}

async fn reaggregate(
    store: &dyn ScriptStore,
    script_id: Uuid,
    kind: MediaKind,
) -> Result<ScriptStatus, StoreError> {
    let statuses: Vec<MediaStatus> = store
        .list_scenes(script_id)
        .await?
        .iter()
        .map(|scene| scene.media_status(kind))
        .collect();
    let status = aggregate_script_status(&statuses);
    store.set_script_status(script_id, status).await?;
    Ok(status)
}

fn scenes_of(generated: &GeneratedScript) -> AppResult<Vec<NewScene>> {
    let scenes = generated.normalized_scenes();
    if scenes.is_empty() {
        return Err(GenerationError::MalformedResponse("script has no scenes".into()).into());
    }
    Ok(scenes)
}

fn non_blank_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

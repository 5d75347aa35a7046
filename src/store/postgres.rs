// src/store/postgres.rs
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ScriptStore, StoreError};
use crate::models::{
    MediaKind, MediaStatus, NewScene, NewSceneImage, NewScript, NewVoiceAudio, Scene, SceneImage,
    Script, ScriptChanges, ScriptDetail, ScriptFilter, ScriptHeader, ScriptImage, ScriptStatus,
    ScriptVoice, VoiceAudio,
};

/// Postgres-backed store (sqlx runtime queries)
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// Unique and foreign key violations are caller mistakes, not outages.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StoreError::Constraint(db_err.message().to_string());
        }
    }
    StoreError::Database(e)
}

async fn insert_scenes_tx(
    tx: &mut Transaction<'_, Postgres>,
    script_id: Uuid,
    scenes: &[NewScene],
) -> Result<Vec<Scene>, StoreError> {
    let mut inserted = Vec::with_capacity(scenes.len());

    for scene in scenes {
        let row = sqlx::query_as::<_, Scene>(
            r#"
            INSERT INTO scenes (
                id, script_id, scene_number, description, duration,
                visual_elements, background_music, voice_over,
                image_status, voice_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(script_id)
        .bind(scene.scene_number)
        .bind(&scene.description)
        .bind(scene.duration)
        .bind(&scene.visual_elements)
        .bind(&scene.background_music)
        .bind(&scene.voice_over)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_error)?;

        inserted.push(row);
    }

    Ok(inserted)
}

#[async_trait]
impl ScriptStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_script(&self, new: NewScript) -> Result<Script, StoreError> {
        let script = sqlx::query_as::<_, Script>(
            r#"
            INSERT INTO video_scripts (
                id, creator_id, title, description, target_audience, total_duration, status
            ) VALUES ($1, $2, $3, $4, $5, $6, 'draft')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.creator_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.target_audience)
        .bind(new.total_duration)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!("📝 Created script {} ({})", script.id, script.title);
        Ok(script)
    }

    async fn insert_scenes(
        &self,
        script_id: Uuid,
        scenes: &[NewScene],
    ) -> Result<Vec<Scene>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_scenes_tx(&mut tx, script_id, scenes).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn rewrite_script(
        &self,
        script_id: Uuid,
        header: ScriptHeader,
        scenes: &[NewScene],
    ) -> Result<Option<ScriptDetail>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let script = sqlx::query_as::<_, Script>(
            r#"
            UPDATE video_scripts
            SET title = $2, description = $3, total_duration = $4, status = 'draft',
                version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(script_id)
        .bind(&header.title)
        .bind(&header.description)
        .bind(header.total_duration)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(script) = script else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM scenes WHERE script_id = $1")
            .bind(script_id)
            .execute(&mut *tx)
            .await?;

        let scenes = insert_scenes_tx(&mut tx, script_id, scenes).await?;
        tx.commit().await?;

        Ok(Some(ScriptDetail { script, scenes }))
    }

    async fn get_script(&self, id: Uuid) -> Result<Option<Script>, StoreError> {
        let script = sqlx::query_as::<_, Script>("SELECT * FROM video_scripts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(script)
    }

    async fn list_scripts(&self, filter: &ScriptFilter) -> Result<Vec<Script>, StoreError> {
        let scripts = sqlx::query_as::<_, Script>(
            r#"
            SELECT * FROM video_scripts
            WHERE ($1::uuid IS NULL OR creator_id = $1)
              AND ($2::script_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter.creator_id)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(scripts)
    }

    async fn update_script(
        &self,
        id: Uuid,
        changes: &ScriptChanges,
    ) -> Result<Option<Script>, StoreError> {
        let script = sqlx::query_as::<_, Script>(
            r#"
            UPDATE video_scripts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                target_audience = COALESCE($4, target_audience),
                status = COALESCE($5, status),
                creator_id = COALESCE($6, creator_id),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.target_audience)
        .bind(changes.status)
        .bind(changes.creator_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(script)
    }

    async fn set_script_status(&self, id: Uuid, status: ScriptStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE video_scripts
            SET status = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_script(&self, id: Uuid) -> Result<bool, StoreError> {
        // scenes, scene_images and voice_audios go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM video_scripts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_scenes(&self, script_id: Uuid) -> Result<Vec<Scene>, StoreError> {
        let scenes = sqlx::query_as::<_, Scene>(
            "SELECT * FROM scenes WHERE script_id = $1 ORDER BY scene_number",
        )
        .bind(script_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scenes)
    }

    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>, StoreError> {
        let scene = sqlx::query_as::<_, Scene>("SELECT * FROM scenes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(scene)
    }

    async fn set_media_status(
        &self,
        scene_id: Uuid,
        kind: MediaKind,
        status: MediaStatus,
    ) -> Result<(), StoreError> {
        let sql = match kind {
            MediaKind::Image => {
                "UPDATE scenes SET image_status = $2, updated_at = NOW() WHERE id = $1"
            }
            MediaKind::Voice => {
                "UPDATE scenes SET voice_status = $2, updated_at = NOW() WHERE id = $1"
            }
        };

        sqlx::query(sql)
            .bind(scene_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_image(&self, new: NewSceneImage) -> Result<SceneImage, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM scene_images WHERE scene_id = $1")
            .bind(new.scene_id)
            .execute(&mut *tx)
            .await?;

        let image = sqlx::query_as::<_, SceneImage>(
            r#"
            INSERT INTO scene_images (id, scene_id, image_url, prompt, width, height, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'completed')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.scene_id)
        .bind(&new.image_url)
        .bind(&new.prompt)
        .bind(new.width)
        .bind(new.height)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            UPDATE scenes
            SET image_status = 'completed', visual_elements = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(new.scene_id)
        .bind(&new.prompt)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    async fn save_voice(&self, new: NewVoiceAudio) -> Result<VoiceAudio, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM voice_audios WHERE scene_id = $1")
            .bind(new.scene_id)
            .execute(&mut *tx)
            .await?;

        let voice = sqlx::query_as::<_, VoiceAudio>(
            r#"
            INSERT INTO voice_audios (id, scene_id, audio_url, text_content, voice_id, speed, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'completed')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.scene_id)
        .bind(&new.audio_url)
        .bind(&new.text_content)
        .bind(&new.voice_id)
        .bind(new.speed)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            UPDATE scenes
            SET voice_status = 'completed', voice_over = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(new.scene_id)
        .bind(&new.text_content)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(voice)
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<SceneImage>, StoreError> {
        let image = sqlx::query_as::<_, SceneImage>("SELECT * FROM scene_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    async fn list_scene_images(&self, scene_id: Uuid) -> Result<Vec<SceneImage>, StoreError> {
        let images = sqlx::query_as::<_, SceneImage>(
            "SELECT * FROM scene_images WHERE scene_id = $1 ORDER BY created_at",
        )
        .bind(scene_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn list_scene_voices(&self, scene_id: Uuid) -> Result<Vec<VoiceAudio>, StoreError> {
        let voices = sqlx::query_as::<_, VoiceAudio>(
            "SELECT * FROM voice_audios WHERE scene_id = $1 ORDER BY created_at",
        )
        .bind(scene_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(voices)
    }

    async fn list_script_images(&self, script_id: Uuid) -> Result<Vec<ScriptImage>, StoreError> {
        let images = sqlx::query_as::<_, ScriptImage>(
            r#"
            SELECT i.*, s.scene_number
            FROM scene_images i
            JOIN scenes s ON s.id = i.scene_id
            WHERE s.script_id = $1
            ORDER BY s.scene_number, i.created_at
            "#,
        )
        .bind(script_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn list_script_voices(&self, script_id: Uuid) -> Result<Vec<ScriptVoice>, StoreError> {
        let voices = sqlx::query_as::<_, ScriptVoice>(
            r#"
            SELECT v.*, s.scene_number
            FROM voice_audios v
            JOIN scenes s ON s.id = v.scene_id
            WHERE s.script_id = $1
            ORDER BY s.scene_number, v.created_at
            "#,
        )
        .bind(script_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(voices)
    }
}

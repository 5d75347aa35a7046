// src/generators.rs
//! Capability interfaces for the external AI collaborators.
//!
//! The coordinator only sees these traits; concrete HTTP clients are built once
//! at startup and injected as `Arc<dyn ...>`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GeneratedScene, GeneratedScript, ScriptDetail};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid credentials for {0}")]
    Unauthorized(&'static str),
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Generation failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.to_string())
    }
}

/// Produces a script skeleton (title, scenes) from a topic.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(
        &self,
        topic: &str,
        target_audience: &str,
        duration: i32,
    ) -> Result<GeneratedScript, GenerationError>;

    /// Rewrite an existing script with more detailed scenes.
    async fn enhance(&self, script: &ScriptDetail) -> Result<GeneratedScript, GenerationError>;

    fn name(&self) -> &'static str;
}

/// Image synthesis. `None` is a non-fatal failure the caller records on the scene.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, width: i32, height: i32) -> Option<String>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Speech synthesis. Returns a content reference (URL or embedded payload).
#[async_trait]
pub trait VoiceGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        voice_id: &str,
        speed: f64,
    ) -> Result<String, GenerationError>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Deterministic script generator used when no LLM key is configured.
pub struct OfflineScriptGenerator;

#[async_trait]
impl ScriptGenerator for OfflineScriptGenerator {
    async fn generate(
        &self,
        topic: &str,
        target_audience: &str,
        duration: i32,
    ) -> Result<GeneratedScript, GenerationError> {
        tracing::info!("📝 Using offline script template for topic: {}", topic);

        let opening = duration / 3;
        let closing = duration / 6;
        let middle = duration - opening - closing;

        let scenes = vec![
            GeneratedScene {
                scene_number: 1,
                description: format!("Opening: introduce {}", topic),
                duration: opening,
                visual_elements: format!(
                    "A bright modern room with natural light from a large window, a presenter standing beside objects related to {}, clean and inviting composition",
                    topic
                ),
                background_music: Some("Light, welcoming background music".to_string()),
                voice_over: Some(format!("Welcome! Today we are talking about {}.", topic)),
            },
            GeneratedScene {
                scene_number: 2,
                description: format!("Highlights: the key points of {}", topic),
                duration: middle,
                visual_elements: format!(
                    "Close-up shots of {} in action, warm LED lighting, shallow depth of field, lively atmosphere",
                    topic
                ),
                background_music: Some("Upbeat background music".to_string()),
                voice_over: Some(format!("Let's explore what makes {} worth your time.", topic)),
            },
            GeneratedScene {
                scene_number: 3,
                description: "Wrap-up and call to action".to_string(),
                duration: closing,
                visual_elements: "Wide shot of the presenter smiling at the camera in soft evening light, subtle text space on the right".to_string(),
                background_music: Some("Calm closing music".to_string()),
                voice_over: Some("Thanks for watching, and don't forget to subscribe!".to_string()),
            },
        ];

        Ok(GeneratedScript {
            title: format!("A video about {}", topic),
            description: format!("An introduction to {} for {}", topic, target_audience),
            target_audience: Some(target_audience.to_string()),
            total_duration: duration,
            scenes,
        })
    }

    async fn enhance(&self, script: &ScriptDetail) -> Result<GeneratedScript, GenerationError> {
        let scenes = script
            .scenes
            .iter()
            .map(|scene| GeneratedScene {
                scene_number: scene.scene_number,
                description: format!("{} (enhanced)", scene.description),
                duration: scene.duration,
                visual_elements: format!("{}, smooth transition into the next shot", scene.visual_elements),
                background_music: scene.background_music.clone(),
                voice_over: scene.voice_over.clone(),
            })
            .collect();

        Ok(GeneratedScript {
            title: script.script.title.clone(),
            description: script.script.description.clone(),
            target_audience: Some(script.script.target_audience.clone()),
            total_duration: script.script.total_duration,
            scenes,
        })
    }

    fn name(&self) -> &'static str {
        "offline-template"
    }
}

/// Installed when no image credentials are configured; every call fails.
pub struct DisabledImageGenerator;

#[async_trait]
impl ImageGenerator for DisabledImageGenerator {
    async fn generate(&self, _prompt: &str, _width: i32, _height: i32) -> Option<String> {
        tracing::warn!("Image generation requested but REPLICATE_API_TOKEN is not set");
        None
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Installed when no speech credentials are configured; every call fails.
pub struct DisabledVoiceGenerator;

#[async_trait]
impl VoiceGenerator for DisabledVoiceGenerator {
    async fn generate(
        &self,
        _text: &str,
        _voice_id: &str,
        _speed: f64,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured("Text-to-speech"))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_generator_splits_duration_over_three_scenes() {
        let script = OfflineScriptGenerator
            .generate("cooking", "teens", 60)
            .await
            .unwrap();

        assert_eq!(script.scenes.len(), 3);
        assert_eq!(script.total_duration, 60);
        let total: i32 = script.scenes.iter().map(|s| s.duration).sum();
        assert_eq!(total, 60);
        assert!(script.description.contains("teens"));
    }

    #[tokio::test]
    async fn disabled_generators_always_fail() {
        assert!(DisabledImageGenerator.generate("x", 1024, 768).await.is_none());
        let err = DisabledVoiceGenerator.generate("x", "vi-VN-Wavenet-A", 1.0).await;
        assert!(matches!(err, Err(GenerationError::NotConfigured(_))));
    }
}

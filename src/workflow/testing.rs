// src/workflow/testing.rs
//! Scripted generators for coordinator and router tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::coordinator::{CoordinatorSettings, WorkflowCoordinator};
use crate::generators::{
    GenerationError, ImageGenerator, OfflineScriptGenerator, ScriptGenerator, VoiceGenerator,
};
use crate::models::{GeneratedScene, GeneratedScript, ScriptDetail};
use crate::store::InMemoryStore;

/// Returns a fixed three-scene script with scenes out of order.
pub struct MockScriptGenerator;

#[async_trait]
impl ScriptGenerator for MockScriptGenerator {
    async fn generate(
        &self,
        topic: &str,
        target_audience: &str,
        duration: i32,
    ) -> Result<GeneratedScript, GenerationError> {
        let scene = |number: i32, visual: &str| GeneratedScene {
            scene_number: number,
            description: format!("{} part {}", topic, number),
            duration: duration / 3,
            visual_elements: visual.to_string(),
            background_music: None,
            voice_over: Some(format!("Narration {}", number)),
        };

        Ok(GeneratedScript {
            title: format!("All about {}", topic),
            description: format!("{} for {}", topic, target_audience),
            target_audience: Some(target_audience.to_string()),
            total_duration: duration,
            scenes: vec![scene(3, "closing shot"), scene(1, "opening shot"), scene(2, "middle shot")],
        })
    }

    async fn enhance(&self, script: &ScriptDetail) -> Result<GeneratedScript, GenerationError> {
        OfflineScriptGenerator.enhance(script).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub struct FailingScriptGenerator;

#[async_trait]
impl ScriptGenerator for FailingScriptGenerator {
    async fn generate(
        &self,
        _topic: &str,
        _target_audience: &str,
        _duration: i32,
    ) -> Result<GeneratedScript, GenerationError> {
        Err(GenerationError::MalformedResponse("no JSON found in response".into()))
    }

    async fn enhance(&self, _script: &ScriptDetail) -> Result<GeneratedScript, GenerationError> {
        Err(GenerationError::Upstream {
            status: 502,
            body: "bad gateway".into(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fails (returns `None`) for prompts containing "fail" while failing is on.
pub struct MockImageGenerator {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(true),
        }
    }
}

impl MockImageGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, prompt: &str, width: i32, height: i32) -> Option<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) && prompt.contains("fail") {
            return None;
        }
        Some(format!("https://images.test/{}-{}x{}.png", n, width, height))
    }
}

/// Errors for texts containing "fail".
#[derive(Default)]
pub struct MockVoiceGenerator {
    calls: AtomicUsize,
}

impl MockVoiceGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceGenerator for MockVoiceGenerator {
    async fn generate(
        &self,
        text: &str,
        _voice_id: &str,
        _speed: f64,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent batches actually interleave.
        tokio::task::yield_now().await;
        if text.contains("fail") {
            return Err(GenerationError::Upstream {
                status: 500,
                body: "synthesis failed".into(),
            });
        }
        Ok("data:audio/mpeg;base64,SUQzBA==".to_string())
    }
}

/// Never answers within a test's lifetime.
pub struct StalledVoiceGenerator;

#[async_trait]
impl VoiceGenerator for StalledVoiceGenerator {
    async fn generate(
        &self,
        _text: &str,
        _voice_id: &str,
        _speed: f64,
    ) -> Result<String, GenerationError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok("data:audio/mpeg;base64,SUQzBA==".to_string())
    }
}

#[derive(Default, Clone)]
pub struct Mocks {
    pub image: Arc<MockImageGenerator>,
    pub voice: Arc<MockVoiceGenerator>,
}

pub fn coordinator_with(store: Arc<InMemoryStore>) -> (WorkflowCoordinator, Mocks) {
    let mocks = Mocks::default();
    let coordinator = WorkflowCoordinator::new(
        store,
        Arc::new(MockScriptGenerator),
        mocks.image.clone(),
        mocks.voice.clone(),
        CoordinatorSettings::default(),
    );
    (coordinator, mocks)
}

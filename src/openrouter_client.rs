// src/openrouter_client.rs
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::generators::{GenerationError, ScriptGenerator};
use crate::models::{GeneratedScript, ScriptDetail};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenRouterClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENROUTER_URL.to_string(),
            model,
        }
    }

    /// One chat completion with retries on connection errors, 429 and 5xx.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        let backoff_config = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let operation = || async {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .header("HTTP-Referer", "http://localhost:3000")
                .header("X-Title", "Script Studio")
                .timeout(Duration::from_secs(120))
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!("OpenRouter connection error (retrying): {}", e);
                        backoff::Error::transient(GenerationError::from(e))
                    } else {
                        backoff::Error::permanent(GenerationError::from(e))
                    }
                })?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| backoff::Error::permanent(GenerationError::from(e)))?;

            if status.as_u16() == 401 {
                tracing::error!("OpenRouter rejected the API key");
                return Err(backoff::Error::permanent(GenerationError::Unauthorized("OpenRouter")));
            }

            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!("OpenRouter returned {} (retrying)", status);
                return Err(backoff::Error::transient(GenerationError::Upstream {
                    status: status.as_u16(),
                    body,
                }));
            }

            if !status.is_success() {
                tracing::error!("OpenRouter error ({}): {}", status, body);
                return Err(backoff::Error::permanent(GenerationError::Upstream {
                    status: status.as_u16(),
                    body,
                }));
            }

            let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
                backoff::Error::permanent(GenerationError::MalformedResponse(format!(
                    "unexpected completion payload: {}",
                    e
                )))
            })?;

            parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| {
                    backoff::Error::permanent(GenerationError::MalformedResponse(
                        "completion has no choices".to_string(),
                    ))
                })
        };

        retry(backoff_config, operation).await
    }
}

/// The JSON object embedded in a model reply: everything from the first `{`
/// to the last `}`.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_script(reply: &str) -> Result<GeneratedScript, GenerationError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| GenerationError::MalformedResponse("no JSON found in response".to_string()))?;

    serde_json::from_str(json).map_err(|e| {
        tracing::error!("Could not parse script JSON: {}", e);
        GenerationError::MalformedResponse(format!("could not parse scenes: {}", e))
    })
}

fn outline_prompt(topic: &str, target_audience: &str, duration: i32) -> String {
    format!(
        r#"Write an engaging video script on the topic: {topic}
Target audience: {target_audience}
Total duration: {duration} seconds

Requirements:
1. Write a complete piece on this topic
2. Give it a clear structure:
   - Opening: introduce the topic
   - Body: develop the main ideas
   - Conclusion: summary and call to action
3. Every part should be detailed and engaging
4. Use language suited to the target audience"#
    )
}

fn scenes_prompt(outline: &str, target_audience: &str, duration: i32) -> String {
    format!(
        r#"Split the following video script into shots:
{outline}

Requirements:
1. Split the content into logical, engaging scenes
2. For each scene describe the setting, lighting and colour, characters and wardrobe, time of day and weather
3. Scene durations must add up to {duration} seconds
4. "visual_elements" must be one English paragraph describing the space, lighting, characters and weather, suitable for image generation
5. Suggest background music that fits the mood of each scene
6. Write the voice-over for each scene

Answer with JSON only:
{{
    "title": "Video title",
    "description": "Overall description",
    "target_audience": "{target_audience}",
    "total_duration": {duration},
    "scenes": [
        {{
            "scene_number": 1,
            "description": "Short description of the scene",
            "duration": 10,
            "visual_elements": "Detailed English description for image generation",
            "background_music": "Suggested background music",
            "voice_over": "Narration"
        }}
    ]
}}"#
    )
}

#[async_trait]
impl ScriptGenerator for OpenRouterClient {
    async fn generate(
        &self,
        topic: &str,
        target_audience: &str,
        duration: i32,
    ) -> Result<GeneratedScript, GenerationError> {
        tracing::info!("📝 Generating video script for topic: {}", topic);

        let outline = self
            .complete(
                "You are a professional video script writer.",
                &outline_prompt(topic, target_audience, duration),
            )
            .await?;
        tracing::debug!("Outline generated ({} chars)", outline.len());

        let reply = self
            .complete(
                "You are an expert in shot breakdowns and visual design who writes vivid, detailed descriptions of settings, lighting and characters.",
                &scenes_prompt(&outline, target_audience, duration),
            )
            .await?;

        let script = parse_script(&reply)?;
        tracing::info!("✅ Generated video script with {} scenes", script.scenes.len());
        Ok(script)
    }

    async fn enhance(&self, script: &ScriptDetail) -> Result<GeneratedScript, GenerationError> {
        tracing::info!("📝 Enhancing video script: {}", script.script.title);

        let current = serde_json::to_string(script)
            .map_err(|e| GenerationError::Failed(format!("could not serialize script: {}", e)))?;

        let prompt = format!(
            r#"Improve the following video script with more detailed direction:
{current}

Requirements:
1. Add detail to every scene
2. Suggest transitions between scenes
3. Optimise the timing
4. Add interactive elements

Answer with JSON only, using the same fields: title, description, total_duration and scenes
(scene_number, description, duration, visual_elements, background_music, voice_over)."#
        );

        let reply = self
            .complete("You are a professional video script editor.", &prompt)
            .await?;

        let enhanced = parse_script(&reply)?;
        tracing::info!("✅ Enhanced video script with {} scenes", enhanced.scenes.len());
        Ok(enhanced)
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_between_outer_braces() {
        let reply = "Sure! Here it is:\n```json\n{\"title\": \"x\", \"scenes\": [{\"a\": 1}]}\n```\nEnjoy.";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"title\": \"x\", \"scenes\": [{\"a\": 1}]}")
        );
    }

    #[test]
    fn no_json_yields_none() {
        assert_eq!(extract_json_object("no braces here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parse_script_reports_malformed_replies() {
        let err = parse_script("I cannot help with that").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));

        let err = parse_script("{\"title\": 42}").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn parse_script_reads_scene_list() {
        let reply = r#"Here you go {"title": "Cooking 101", "description": "Basics",
            "target_audience": "teens", "total_duration": 60,
            "scenes": [{"scene_number": 1, "description": "Intro", "duration": 20,
            "visual_elements": ["kitchen", "morning light"], "voice_over": "Hi"}]}"#;

        let script = parse_script(reply).unwrap();
        assert_eq!(script.title, "Cooking 101");
        assert_eq!(script.scenes.len(), 1);
        assert_eq!(script.scenes[0].visual_elements, "kitchen, morning light");
        assert!(script.scenes[0].background_music.is_none());
    }

    #[test]
    fn scene_prompt_embeds_duration_and_audience() {
        let prompt = scenes_prompt("outline", "teens", 60);
        assert!(prompt.contains("\"total_duration\": 60"));
        assert!(prompt.contains("\"target_audience\": \"teens\""));
    }
}

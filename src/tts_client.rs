// src/tts_client.rs
// Google Cloud Text-to-Speech REST client
// Docs: https://cloud.google.com/text-to-speech/docs/reference/rest

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::generators::{GenerationError, VoiceGenerator};

#[derive(Debug, Clone)]
pub struct GoogleTtsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// `vi-VN-Wavenet-A` → `vi-VN`. Voice names always start with the BCP-47 code.
pub fn language_code_from_voice(voice_id: &str) -> &str {
    let mut dashes = voice_id.match_indices('-').map(|(index, _)| index);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice_id[..second],
        _ => voice_id,
    }
}

impl GoogleTtsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://texttospeech.googleapis.com/v1".to_string(),
        }
    }

    /// Synthesize MP3 audio and return the raw base64 payload.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        speed: f64,
    ) -> Result<String, GenerationError> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language_code_from_voice(voice_id),
                name: voice_id,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: speed,
            },
        };

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .query(&[("key", &self.api_key)])
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GenerationError::Unauthorized("Google Text-to-Speech"));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(format!("TTS response: {}", e)))?;

        // Reject payloads that are not valid base64 before they reach the store.
        STANDARD
            .decode(&body.audio_content)
            .map_err(|e| GenerationError::MalformedResponse(format!("audio content: {}", e)))?;

        Ok(body.audio_content)
    }
}

#[async_trait]
impl VoiceGenerator for GoogleTtsClient {
    async fn generate(
        &self,
        text: &str,
        voice_id: &str,
        speed: f64,
    ) -> Result<String, GenerationError> {
        tracing::info!("🎙️ Generating voice for text length: {} (voice: {}, speed: {})", text.len(), voice_id, speed);

        let audio = self.synthesize(text, voice_id, speed).await?;
        Ok(format!("data:audio/mpeg;base64,{}", audio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_is_the_voice_prefix() {
        assert_eq!(language_code_from_voice("vi-VN-Wavenet-A"), "vi-VN");
        assert_eq!(language_code_from_voice("en-US-Neural2-C"), "en-US");
        assert_eq!(language_code_from_voice("cmn-CN-Standard-A"), "cmn-CN");
        assert_eq!(language_code_from_voice("en"), "en");
    }

    #[test]
    fn request_uses_google_field_names() {
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "xin chào" },
            voice: VoiceSelection {
                language_code: "vi-VN",
                name: "vi-VN-Wavenet-A",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: 1.25,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["voice"]["languageCode"], "vi-VN");
        assert_eq!(value["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(value["audioConfig"]["speakingRate"], 1.25);
    }
}

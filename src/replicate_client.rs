// src/replicate_client.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::generators::{GenerationError, ImageGenerator};

/// Stable Diffusion XL on Replicate
pub const DEFAULT_MODEL_VERSION: &str =
    "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 90;

#[derive(Debug, Clone)]
pub struct ReplicateClient {
    client: Client,
    api_token: String,
    base_url: String,
    model_version: String,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    urls: PredictionUrls,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

/// First image URL of a prediction output (a list of URLs or a single URL).
fn first_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(first_output_url),
        _ => None,
    }
}

impl ReplicateClient {
    pub fn new(api_token: String, model_version: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_token,
            base_url: "https://api.replicate.com/v1".to_string(),
            model_version: model_version.unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
        }
    }

    async fn create_prediction(
        &self,
        prompt: &str,
        width: i32,
        height: i32,
    ) -> Result<Prediction, GenerationError> {
        let body = json!({
            "version": self.model_version,
            "input": {
                "prompt": prompt,
                "width": width,
                "height": height,
                "num_outputs": 1,
                "scheduler": "K_EULER",
                "num_inference_steps": 50,
                "guidance_scale": 7.5,
                "negative_prompt": "blurry, low quality, distorted, deformed",
                "prompt_strength": 0.8,
                "refine": "expert_ensemble_refiner",
                "high_noise_frac": 0.8
            }
        });

        let response = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .bearer_auth(&self.api_token)
            .timeout(Duration::from_secs(60))
            .json(&body)
            .send()
            .await?;

        parse_prediction(response).await
    }

    async fn fetch_prediction(&self, url: &str) -> Result<Prediction, GenerationError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        parse_prediction(response).await
    }

    async fn run(&self, prompt: &str, width: i32, height: i32) -> Result<String, GenerationError> {
        let mut prediction = self.create_prediction(prompt, width, height).await?;
        tracing::debug!("🖼️ Replicate prediction {} created", prediction.id);

        let mut polls = 0;
        while !prediction.is_terminal() {
            if polls >= MAX_POLLS {
                return Err(GenerationError::Failed(format!(
                    "prediction {} timed out",
                    prediction.id
                )));
            }
            polls += 1;
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.fetch_prediction(&prediction.urls.get).await?;
        }

        finished_output(&prediction)
    }
}

async fn parse_prediction(response: reqwest::Response) -> Result<Prediction, GenerationError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GenerationError::Unauthorized("Replicate"));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GenerationError::MalformedResponse(format!("prediction: {}", e)))
}

/// Image URL of a terminal prediction.
fn finished_output(prediction: &Prediction) -> Result<String, GenerationError> {
    if prediction.status != "succeeded" {
        return Err(GenerationError::Failed(format!(
            "prediction {} {}: {}",
            prediction.id,
            prediction.status,
            prediction.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
        )));
    }

    prediction
        .output
        .as_ref()
        .and_then(first_output_url)
        .ok_or_else(|| {
            GenerationError::MalformedResponse(format!(
                "prediction {} returned no image",
                prediction.id
            ))
        })
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate(&self, prompt: &str, width: i32, height: i32) -> Option<String> {
        match self.run(prompt, width, height).await {
            Ok(url) => {
                tracing::info!("✅ Image generated: {}", url);
                Some(url)
            }
            Err(e) => {
                tracing::error!("Error generating image: {}", e);
                None
            }
        }
    }
}

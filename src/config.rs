// src/config.rs
//! Process configuration read from the environment (after `.env` is loaded).

use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_OPENROUTER_MODEL: &str = "deepseek/deepseek-chat";
pub const DEFAULT_VOICE_ID: &str = "vi-VN-Wavenet-A";
const DEV_JWT_SECRET: &str = "script-studio-development-secret";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub replicate_api_token: Option<String>,
    pub replicate_model_version: Option<String>,
    pub google_tts_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub rapidapi_key: Option<String>,
    pub default_voice_id: String,
    pub media_concurrency: usize,
    pub max_concurrent_jobs: usize,
    pub job_retention_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, the way .env templates leave them.
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL");

        let jwt_secret = match (var("JWT_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => return Err(ConfigError::Missing { name: "JWT_SECRET" }),
            (None, None) => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let media_concurrency: usize = parse_or("MEDIA_CONCURRENCY", var("MEDIA_CONCURRENCY"), 1)?;
        let max_concurrent_jobs: usize =
            parse_or("MAX_CONCURRENT_JOBS", var("MAX_CONCURRENT_JOBS"), 2)?;
        let job_retention_hours: i64 =
            parse_or("JOB_RETENTION_HOURS", var("JOB_RETENTION_HOURS"), 24)?;

        if media_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "MEDIA_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_CONCURRENT_JOBS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            openrouter_api_key: var("OPENROUTER_API_KEY"),
            openrouter_model: var("OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            replicate_api_token: var("REPLICATE_API_TOKEN"),
            replicate_model_version: var("REPLICATE_MODEL_VERSION"),
            google_tts_api_key: var("GOOGLE_TTS_API_KEY"),
            youtube_api_key: var("YOUTUBE_API_KEY"),
            rapidapi_key: var("RAPIDAPI_KEY"),
            default_voice_id: var("DEFAULT_VOICE_ID").unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            media_concurrency,
            max_concurrent_jobs,
            job_retention_hours,
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

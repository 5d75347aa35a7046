use std::sync::Arc;

use script_studio::config::AppConfig;
use script_studio::generators::{
    DisabledImageGenerator, DisabledVoiceGenerator, ImageGenerator, OfflineScriptGenerator,
    ScriptGenerator, VoiceGenerator,
};
use script_studio::jobs::JobManager;
use script_studio::openrouter_client::OpenRouterClient;
use script_studio::replicate_client::ReplicateClient;
use script_studio::store::{InMemoryStore, PgStore, ScriptStore};
use script_studio::tiktok_client::TikTokClient;
use script_studio::tts_client::GoogleTtsClient;
use script_studio::workflow::{CoordinatorSettings, WorkflowCoordinator};
use script_studio::youtube_client::YouTubeClient;
use script_studio::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("❌ Invalid configuration: {}", e);
        e
    })?;

    let store: Arc<dyn ScriptStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = db::create_pool(url).await?;
            tracing::info!("✅ Database ready, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not found. Scripts are kept in memory and lost on restart.");
            Arc::new(InMemoryStore::new())
        }
    };

    let script_generator: Arc<dyn ScriptGenerator> = match &config.openrouter_api_key {
        Some(api_key) => {
            tracing::info!("Initializing OpenRouter client ({})...", config.openrouter_model);
            Arc::new(OpenRouterClient::new(
                api_key.clone(),
                config.openrouter_model.clone(),
            ))
        }
        None => {
            tracing::warn!("OPENROUTER_API_KEY not found. Using the offline script template.");
            Arc::new(OfflineScriptGenerator)
        }
    };

    let image_generator: Arc<dyn ImageGenerator> = match &config.replicate_api_token {
        Some(token) => {
            tracing::info!("Initializing Replicate image client...");
            Arc::new(ReplicateClient::new(
                token.clone(),
                config.replicate_model_version.clone(),
            ))
        }
        None => {
            tracing::warn!("REPLICATE_API_TOKEN not found. Image generation will be disabled.");
            Arc::new(DisabledImageGenerator)
        }
    };

    let voice_generator: Arc<dyn VoiceGenerator> = match &config.google_tts_api_key {
        Some(api_key) => {
            tracing::info!("Initializing Google Text-to-Speech client...");
            Arc::new(GoogleTtsClient::new(api_key.clone()))
        }
        None => {
            tracing::warn!("GOOGLE_TTS_API_KEY not found. Voice generation will be disabled.");
            Arc::new(DisabledVoiceGenerator)
        }
    };

    let youtube_client = match &config.youtube_api_key {
        Some(api_key) => {
            tracing::info!("Initializing YouTube Data API client...");
            Some(YouTubeClient::new(api_key.clone()))
        }
        None => {
            tracing::warn!("YOUTUBE_API_KEY not found. Video search will be disabled.");
            None
        }
    };

    let tiktok_client = match &config.rapidapi_key {
        Some(api_key) => {
            tracing::info!("Initializing TikTok search client (RapidAPI)...");
            Some(TikTokClient::new(api_key.clone()))
        }
        None => {
            tracing::warn!("RAPIDAPI_KEY not found. TikTok search will be disabled.");
            None
        }
    };

    let settings = CoordinatorSettings {
        default_voice_id: config.default_voice_id.clone(),
        media_concurrency: config.media_concurrency,
        ..CoordinatorSettings::default()
    };
    let coordinator = Arc::new(WorkflowCoordinator::new(
        store.clone(),
        script_generator,
        image_generator,
        voice_generator,
        settings,
    ));

    let job_manager = Arc::new(JobManager::new(config.max_concurrent_jobs));
    tracing::info!("✅ Job manager initialized ({} workers)", config.max_concurrent_jobs);

    let shared_state = Arc::new(AppState {
        store,
        coordinator,
        job_manager: job_manager.clone(),
        youtube_client,
        tiktok_client,
        jwt_secret: config.jwt_secret.clone(),
    });

    // Drop finished jobs past their retention window
    let retention_hours = config.job_retention_hours;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = job_manager.cleanup_old_jobs(retention_hours).await;
            if removed > 0 {
                tracing::info!("🗑️ Cleaned up {} finished jobs", removed);
            }
        }
    });

    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,script_studio=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,script_studio=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON output for log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("🎬 Script Studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

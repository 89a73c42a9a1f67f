use std::net::SocketAddr;
use std::sync::Arc;

use decor_assist::api::{self, AppState};
use decor_assist::config::{PipelineConfig, ServerConfig};
use decor_assist::dialogue::{SessionRegistry, spawn_expiry_task};
use decor_assist::error::ConfigError;
use decor_assist::jobs::{OutputDirs, spawn_cleanup_task};
use decor_assist::pipelines::Pipelines;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log to stderr, or to a daily file under `DECOR_ASSIST_LOG_DIR` when set.
/// The returned guard must live as long as the process.
fn init_tracing() -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var("DECOR_ASSIST_LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "decor-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_tracing();

    let config = ServerConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();

    eprintln!("🛋️  Decor Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API:      http://0.0.0.0:{}/api/v1", config.port);
    eprintln!("   Chat:     http://0.0.0.0:{}/chat", config.port);
    eprintln!("   Job WS:   ws://0.0.0.0:{}/ws/jobs", config.port);
    eprintln!("   Data dir: {}", config.data_dir.display());
    eprintln!(
        "   Image backend: {}",
        if pipeline_config.hf_api_key.is_some() {
            pipeline_config.image_api_url.as_str()
        } else {
            "placeholder (HF_API_KEY not set)"
        }
    );
    eprintln!(
        "   Video backend: {}",
        pipeline_config.video_api_url.as_deref().unwrap_or("not configured")
    );
    eprintln!(
        "   TTS backend:   {}",
        pipeline_config.tts_api_url.as_deref().unwrap_or("not configured")
    );

    // ── Output directories ──────────────────────────────────────────────
    let dirs = OutputDirs::from_config(&config);
    dirs.ensure().await?;
    tokio::fs::create_dir_all(&config.tts_dir)
        .await
        .map_err(|source| ConfigError::Directory {
            path: config.tts_dir.clone(),
            source,
        })?;

    // ── Pipelines ───────────────────────────────────────────────────────
    let pipelines = Pipelines::from_config(&pipeline_config);
    if config.preload_models {
        eprintln!("   Preloading model backends...");
        pipelines.preload().await;
    }

    let _cleanup_handle =
        spawn_cleanup_task(dirs, config.cleanup_interval, config.cleanup_max_age);

    let sessions = SessionRegistry::new(config.data_dir.clone())
        .with_idle_timeout(config.session_idle_timeout);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let session_check = config.cleanup_interval;
    let state = AppState::new(config, pipelines, sessions);
    let _expiry_handle = spawn_expiry_task(Arc::clone(&state.sessions), session_check);

    api::serve(state, addr).await?;
    Ok(())
}

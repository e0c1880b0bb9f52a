use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use moodlens_store::Store;
use moodlensd::config::Config;
use moodlensd::identity::DemoIdentity;
use moodlensd::service::PredictionService;
use moodlensd::{build_router, engine, session, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    tracing::info!("moodlensd starting");

    let config = Config::from_env();

    let store = Store::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?
        .with_default_avatar(config.default_avatar_url.clone());
    let default_user = store.provision(&config.default_user).await?;
    tracing::info!(
        path = %config.db_path.display(),
        default_user = %default_user.username,
        "database ready"
    );

    let engine_settings = config.engine_settings();
    let engine = tokio::task::spawn_blocking(move || engine::spawn_engine(engine_settings))
        .await?
        .context("failed to start inference engine")?;
    if !engine.model_loaded() {
        tracing::warn!(
            path = %config.classifier_model.display(),
            "running without an emotion model; /api/predict will fail"
        );
    }

    let state = AppState {
        service: PredictionService::new(engine, store.clone()),
        identity: Arc::new(DemoIdentity::new(store.clone(), config.default_user.clone())),
        store,
        cookie_key: session::session_key(config.secret_key.as_deref()),
        history_limit: config.history_limit,
        max_upload_bytes: config.max_upload_bytes,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "moodlensd ready");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("moodlensd shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

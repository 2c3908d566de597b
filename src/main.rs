mod api;
mod config;
mod engine;
mod error;
mod geo;
mod models;
mod observability;
mod settings;
mod state;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::engine::feed::send_command;
use crate::models::monitor::MonitorCommand;
use crate::models::object::{decode_records, RawObjectRecord};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, monitor_channels) = state::AppState::new(&config);
    let shared_state = Arc::new(app_state);

    if let Some(seed_path) = &config.seed_path {
        seed_objects(&shared_state, seed_path)?;
    }

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::monitor::run_proximity_monitor(
        shared_state.clone(),
        monitor_channels,
    ));

    if shared_state.settings.current().monitor_enabled {
        tracing::info!("monitor enabled in persisted settings; starting");
        send_command(&shared_state, MonitorCommand::Start).await?;
    }

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

fn seed_objects(state: &state::AppState, path: &Path) -> Result<(), error::AppError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        error::AppError::Internal(format!("failed to read seed file {}: {err}", path.display()))
    })?;

    let records: Vec<RawObjectRecord> = serde_json::from_str(&raw).map_err(|err| {
        error::AppError::Internal(format!("invalid seed file {}: {err}", path.display()))
    })?;

    for object in decode_records(records) {
        if !object.category.is_empty() {
            state.categories.insert(object.category.clone());
        }
        state.objects.insert(object.id, object);
    }

    tracing::info!(count = state.objects.len(), "objects seeded");
    Ok(())
}

// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::poll_scheduler::PollScheduler;
use crate::application::sample_source::SampleSource;
use crate::application::state_store::StateStore;
use crate::infrastructure::config::{
    load_dashboard_config, load_metrics_config, scheduler_settings, SourceSettings,
};
use crate::infrastructure::file_source::FileSampleSource;
use crate::infrastructure::http_source::HttpSampleSource;
use crate::infrastructure::state_store::{JsonFileStore, MemoryStore};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    export_history, get_dashboard, health_check, put_interval, put_theme, stream_dashboard,
};
use crate::presentation::view_sink::WatchSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let dashboard_config = load_dashboard_config()?;
    let metrics_config = load_metrics_config()?;
    let settings = scheduler_settings(&dashboard_config, &metrics_config)?;

    // Create adapters (infrastructure layer)
    let source: Arc<dyn SampleSource> = match &dashboard_config.source {
        SourceSettings::Http {
            current_url,
            history_url,
            timeout_ms,
        } => Arc::new(HttpSampleSource::new(
            current_url.clone(),
            history_url.clone(),
            Duration::from_millis(*timeout_ms),
        )?),
        SourceSettings::File {
            current_path,
            history_path,
        } => Arc::new(FileSampleSource::new(current_path.clone(), history_path.clone())),
    };

    let store: Box<dyn StateStore> = match JsonFileStore::open(&dashboard_config.storage.path) {
        Ok(store) => {
            tracing::info!("Persisting dashboard state to {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "State file {} unusable, counters will not persist: {}",
                dashboard_config.storage.path.display(),
                e
            );
            Box::new(MemoryStore::new())
        }
    };

    // Create the scheduler (application layer)
    let (sink, views) = WatchSink::new();
    let mut scheduler = PollScheduler::new(source, store, Arc::new(sink), settings)?;
    scheduler.seed_history().await;
    let handle = scheduler.start();

    // Create application state
    let state = Arc::new(AppState {
        views,
        scheduler: handle.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/history/export", get(export_history))
        .route("/settings/interval", put(put_interval))
        .route("/settings/theme", put(put_theme))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = dashboard_config.server.bind.parse()?;
    tracing::info!("Starting water-quality dashboard on {}", addr);

    let shutdown_handle = handle.clone();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Could not listen for shutdown signal: {}", e);
            }
            shutdown_handle.stop();
        })
        .await?;

    handle.shutdown().await;
    Ok(())
}

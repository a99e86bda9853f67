//! vodsync API binary.
//!
//! Wires configuration, tracing, the stores and orchestrators, spawns
//! the access-sync sweeper and serves the HTTP boundary.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vodsync_api::{create_router, ApiConfig, AppState};
use vodsync_pipeline::{AccessSyncSweeper, PipelineConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vodsync=info".parse().unwrap())
        .add_directive("tower_http=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vodsync-api");

    let api_config = ApiConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", pipeline_config);

    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to install metrics recorder: {e}");
            None
        }
    };

    let state = match AppState::from_env(pipeline_config.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {e}");
            std::process::exit(1);
        }
    };

    // Background retry sweeper with its own shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = AccessSyncSweeper::new(
        Arc::clone(&state.jobs),
        Arc::clone(&state.sync),
        pipeline_config,
    );
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    let app = create_router(state, metrics_handle);

    let listener = match tokio::net::TcpListener::bind(&api_config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {e}", api_config.bind_addr);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", api_config.bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
        })
        .await
    {
        error!("Server error: {e}");
    }

    shutdown_tx.send(true).ok();
    sweeper_task.await.ok();

    info!("vodsync-api shutdown complete");
}

//! fastmetrics exporter
//!
//! - `/metrics`: Prometheus text exposition
//! - `/healthz`, `/readyz`: liveness and readiness
//! - Ctrl-C: mark draining, stop serving, then stop the metrics worker

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use fastmetrics_core::error::{MetricsError, Result};
use fastmetrics_exporter::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var(config::CONFIG_ENV).ok();
    let cfg = config::load(path.as_deref())?;
    let listen: SocketAddr = cfg.exporter.socket_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "fastmetrics-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MetricsError::Internal(format!("bind {listen} failed: {e}")))?;

    let draining = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler failed, shutting down");
            }
            draining.set_draining();
            tracing::info!("shutdown signal received, draining");
        })
        .await
        .map_err(|e| MetricsError::Internal(format!("server failed: {e}")))?;

    // joining the worker thread blocks
    tokio::task::spawn_blocking(move || state.shutdown())
        .await
        .map_err(|e| MetricsError::Internal(format!("worker shutdown task failed: {e}")))??;

    tracing::info!("fastmetrics-exporter stopped");
    Ok(())
}

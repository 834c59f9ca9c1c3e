//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use fastmetrics_core::exposition::CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let timer = state.scrape_duration().start_timer();
    let registry = state.registry();

    // collectors block on the metrics worker
    let rendered = tokio::task::spawn_blocking(move || registry.render()).await;
    timer.observe_duration();

    match rendered {
        Ok(Ok(body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "metrics render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.code().as_str()).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "metrics render task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL").into_response()
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    /// `"ready"` or `"not_ready"`.
    pub status: &'static str,
    /// Whether at least one polling cycle has published.
    pub snapshot_published: bool,
    /// Whether the appliance still accepts our credentials.
    pub credentials_ok: bool,
}

/// Liveness probe. Always 200 while the process runs.
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
    })
}

/// Readiness probe. 200 once a snapshot exists and the credentials
/// have not been rejected, 503 otherwise.
pub async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot_published = state.store.is_populated();
    let credentials_ok = state.auth_ok.load(Ordering::Relaxed);
    let ready = snapshot_published && credentials_ok;
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" },
            snapshot_published,
            credentials_ok,
        }),
    )
}

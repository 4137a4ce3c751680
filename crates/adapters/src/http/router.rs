use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use super::health_handler::{healthz, readyz};
use super::metrics_handler::metrics;
use super::state::AppState;

/// Build the exposition router.
///
/// `/metrics` serves the snapshot, `/healthz` and `/readyz` serve the
/// probes. All routes are unauthenticated reads.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use application::registry::SnapshotStore;
    use infrastructure::config::EmptyScrape;

    #[test]
    fn build_router_does_not_panic() {
        let state = Arc::new(AppState::new(
            Arc::new(SnapshotStore::new()),
            Arc::new(AtomicBool::new(true)),
            EmptyScrape::Empty,
        ));
        let _router = build_router(state);
    }
}

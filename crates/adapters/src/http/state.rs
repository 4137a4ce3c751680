use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use application::registry::SnapshotStore;
use infrastructure::config::EmptyScrape;

/// Shared state for the exposition server.
///
/// Passed to Axum handlers via `State(Arc<AppState>)`.
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    /// Cleared by the scheduler when the appliance rejects our
    /// credentials; drives `/readyz`.
    pub auth_ok: Arc<AtomicBool>,
    /// What `/metrics` returns before the first cycle publishes.
    pub empty_scrape: EmptyScrape,
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<SnapshotStore>,
        auth_ok: Arc<AtomicBool>,
        empty_scrape: EmptyScrape,
    ) -> Self {
        Self {
            store,
            auth_ok,
            empty_scrape,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::collector::{Collector, CycleError};

/// Fixed-interval polling loop.
///
/// Cycles never overlap: the tick runs on the same task as the cycle,
/// and ticks that fire while a cycle is still running are skipped. A
/// fatal cycle error (rejected credentials) stops the loop, clears the
/// readiness flag and leaves the last snapshot published.
pub struct PollScheduler {
    collector: Collector,
    interval: Duration,
    auth_ok: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PollScheduler {
    #[must_use]
    pub fn new(
        collector: Collector,
        interval: Duration,
        auth_ok: Arc<AtomicBool>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            collector,
            interval,
            auth_ok,
            shutdown,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!("poll scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let cycle_start = tokio::time::Instant::now();
            match self.collector.run_cycle().await {
                Ok(report) => {
                    tracing::debug!(
                        resources = report.resources,
                        degraded = report.degraded,
                        "cycle finished"
                    );
                }
                Err(CycleError::Enumeration(e)) => {
                    tracing::warn!(error = %e, "cycle aborted, retrying next interval");
                }
                Err(CycleError::Fatal(e)) => {
                    tracing::error!(error = %e, "credentials rejected, polling stopped");
                    self.auth_ok.store(false, Ordering::SeqCst);
                    return;
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed > self.interval {
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    interval_ms = self.interval.as_millis() as u64,
                    "cycle overran the poll interval, next tick skipped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorConfig;
    use crate::registry::SnapshotStore;
    use domain::common::error::ApiError;
    use ports::test_utils::{ApiOp, MockAppliance, test_resource};

    fn collector(mock: MockAppliance, store: &Arc<SnapshotStore>) -> Collector {
        Collector::new(
            Arc::new(mock),
            Arc::clone(store),
            CollectorConfig {
                request_timeout: Duration::from_secs(5),
                cycle_deadline: Duration::from_secs(20),
                max_concurrent_resources: 2,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_cancelled() {
        let store = Arc::new(SnapshotStore::new());
        let mock =
            MockAppliance::new().with_resource(test_resource(1, "A"), Default::default());
        let auth_ok = Arc::new(AtomicBool::new(true));
        let shutdown = CancellationToken::new();

        let scheduler = PollScheduler::new(
            collector(mock, &store),
            Duration::from_secs(60),
            Arc::clone(&auth_ok),
            shutdown.clone(),
        );
        let handle = tokio::spawn(scheduler.run());

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(store.is_populated());
        assert!(auth_ok.load(Ordering::SeqCst));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_the_loop_and_clears_readiness() {
        let store = Arc::new(SnapshotStore::new());
        let mock = MockAppliance::new().with_failure(
            ApiOp::ResourceList,
            None,
            ApiError::Auth("bad secret".to_string()),
        );
        let auth_ok = Arc::new(AtomicBool::new(true));

        let scheduler = PollScheduler::new(
            collector(mock, &store),
            Duration::from_secs(60),
            Arc::clone(&auth_ok),
            CancellationToken::new(),
        );
        // Returns on its own, no cancellation needed.
        scheduler.run().await;

        assert!(!auth_ok.load(Ordering::SeqCst));
        assert!(store.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_enumeration_failure_keeps_polling() {
        let store = Arc::new(SnapshotStore::new());
        let mock = MockAppliance::new().with_failure(
            ApiOp::ResourceList,
            None,
            ApiError::Transport("connection refused".to_string()),
        );
        let auth_ok = Arc::new(AtomicBool::new(true));
        let shutdown = CancellationToken::new();

        let scheduler = PollScheduler::new(
            collector(mock, &store),
            Duration::from_secs(60),
            Arc::clone(&auth_ok),
            shutdown.clone(),
        );
        let handle = tokio::spawn(scheduler.run());

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert!(auth_ok.load(Ordering::SeqCst), "transport errors are not fatal");
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
    }
}

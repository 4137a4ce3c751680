use std::sync::Arc;

use arc_swap::ArcSwapOption;
use domain::snapshot::Snapshot;

/// Single-cell snapshot store.
///
/// Holds zero or one snapshot. `publish` is one atomic pointer swap, so
/// a scrape running concurrently with a publish sees either the old
/// snapshot or the new one in full, never a mixture. Scrapes that
/// obtained the old `Arc` keep a valid snapshot until they drop it.
pub struct SnapshotStore {
    cell: ArcSwapOption<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: ArcSwapOption::const_empty(),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.cell.store(Some(Arc::new(snapshot)));
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.cell.load_full()
    }

    /// True once a first cycle has published.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.cell.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::snapshot::SnapshotBuilder;
    use std::time::{Duration, SystemTime};

    fn snapshot(at: SystemTime) -> Snapshot {
        SnapshotBuilder::new(at).finish()
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_populated());
    }

    #[test]
    fn publish_replaces_the_whole_snapshot() {
        let store = SnapshotStore::new();
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(60);

        store.publish(snapshot(t0));
        let held = store.current().unwrap();
        assert_eq!(held.started_at, t0);

        store.publish(snapshot(t1));
        // The reader that loaded before the swap still holds the old
        // generation; new readers see the new one.
        assert_eq!(held.started_at, t0);
        assert_eq!(store.current().unwrap().started_at, t1);
    }
}

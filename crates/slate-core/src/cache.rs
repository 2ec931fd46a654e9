//! Time-bounded snapshot cache over the row store
//!
//! Reads within the TTL reuse the last fetch; a failed refresh falls back to
//! the last known-good snapshot (or an empty one on first fetch) and surfaces
//! the error alongside the data, so a transient store failure never takes the
//! view down.

use std::time::{Duration, Instant};

use crate::error::Error;
use crate::models::{Task, TaskId};
use crate::store::{Row, RowStore};

/// Default time-to-live for a cached snapshot
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(10);

/// An immutable view of the store's committed task rows as last fetched
#[derive(Debug, Clone)]
pub struct Snapshot {
    tasks: Vec<Task>,
    fetched_at: Instant,
}

impl Snapshot {
    /// An empty snapshot, used before the first successful fetch
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            fetched_at: Instant::now(),
        }
    }

    /// Parse fetched rows into a snapshot.
    ///
    /// Rows that do not decode as tasks are dropped from the view (they still
    /// occupy physical positions; identity resolution works on raw rows).
    #[must_use]
    pub fn from_rows(rows: &[Row]) -> Self {
        let tasks = rows
            .iter()
            .enumerate()
            .filter_map(|(position, row)| match Task::from_row(row) {
                Ok(task) => Some(task),
                Err(error) => {
                    tracing::warn!("skipping unreadable row at position {position}: {error}");
                    None
                }
            })
            .collect();
        Self {
            tasks,
            fetched_at: Instant::now(),
        }
    }

    /// Committed tasks in physical fetch order
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a committed task by logical id
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Time elapsed since this snapshot was fetched
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    #[cfg(test)]
    pub(crate) fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            fetched_at: Instant::now(),
        }
    }
}

/// Outcome of one cache read: always a snapshot, plus the refresh error when
/// the snapshot is stale because the fetch failed
#[derive(Debug)]
pub struct CacheRead<'a> {
    /// The freshest snapshot available
    pub snapshot: &'a Snapshot,
    /// Set when a refresh was due but failed; the snapshot is then the last
    /// known-good state
    pub fetch_error: Option<Error>,
}

/// Per-session cache of the tasks table
#[derive(Debug)]
pub struct SnapshotCache {
    current: Option<Snapshot>,
    empty: Snapshot,
    ttl: Duration,
}

impl SnapshotCache {
    /// Create a cache with the default TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SNAPSHOT_TTL)
    }

    /// Create a cache with an explicit TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            current: None,
            empty: Snapshot::empty(),
            ttl,
        }
    }

    /// Return the cached snapshot, refetching when it has expired.
    ///
    /// Network I/O happens only on a cache miss. Refresh failures are
    /// reported in the result, never raised.
    pub fn get(&mut self, store: &dyn RowStore) -> CacheRead<'_> {
        let mut fetch_error = None;
        let needs_refresh = self
            .current
            .as_ref()
            .is_none_or(|snapshot| snapshot.age() >= self.ttl);

        if needs_refresh {
            match store.fetch_all_rows() {
                Ok(rows) => self.current = Some(Snapshot::from_rows(&rows)),
                Err(error) => {
                    tracing::warn!("snapshot refresh failed, serving stale data: {error}");
                    fetch_error = Some(Error::Fetch(error.to_string()));
                }
            }
        }

        // The empty fallback is never promoted into `current`: a failed
        // first fetch must not look like a fresh empty table, and the next
        // read must retry the store.
        CacheRead {
            snapshot: self.current.as_ref().unwrap_or(&self.empty),
            fetch_error,
        }
    }

    /// Force the next [`get`](Self::get) to refetch
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Whether a snapshot is currently cached
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.current.is_some()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::Task;
    use crate::store::InMemoryRowStore;
    use std::cell::Cell;

    /// Store wrapper whose fetches can be forced to fail
    struct FlakyStore {
        inner: InMemoryRowStore,
        fail_fetch: Cell<bool>,
        fetches: Cell<usize>,
    }

    impl FlakyStore {
        fn new(inner: InMemoryRowStore) -> Self {
            Self {
                inner,
                fail_fetch: Cell::new(false),
                fetches: Cell::new(0),
            }
        }
    }

    impl RowStore for FlakyStore {
        fn fetch_all_rows(&self) -> Result<Vec<Row>> {
            self.fetches.set(self.fetches.get() + 1);
            if self.fail_fetch.get() {
                return Err(Error::Store("connection reset".to_string()));
            }
            self.inner.fetch_all_rows()
        }

        fn append_rows(&mut self, rows: Vec<Row>) -> Result<()> {
            self.inner.append_rows(rows)
        }

        fn update_cell(&mut self, position: usize, column: usize, value: &str) -> Result<()> {
            self.inner.update_cell(position, column, value)
        }

        fn delete_row(&mut self, position: usize) -> Result<()> {
            self.inner.delete_row(position)
        }
    }

    fn seeded_store() -> InMemoryRowStore {
        let task = Task::new("Cached", "", "alice", "bob");
        InMemoryRowStore::with_rows(vec![task.to_row()])
    }

    #[test]
    fn test_get_within_ttl_fetches_once() {
        let store = FlakyStore::new(seeded_store());
        let mut cache = SnapshotCache::with_ttl(Duration::from_secs(3600));

        assert_eq!(cache.get(&store).snapshot.tasks().len(), 1);
        assert_eq!(cache.get(&store).snapshot.tasks().len(), 1);
        assert_eq!(store.fetches.get(), 1);
    }

    #[test]
    fn test_zero_ttl_refetches_every_read() {
        let store = FlakyStore::new(seeded_store());
        let mut cache = SnapshotCache::with_ttl(Duration::ZERO);

        cache.get(&store);
        cache.get(&store);
        assert_eq!(store.fetches.get(), 2);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let store = FlakyStore::new(seeded_store());
        let mut cache = SnapshotCache::with_ttl(Duration::from_secs(3600));

        cache.get(&store);
        cache.invalidate();
        cache.get(&store);
        assert_eq!(store.fetches.get(), 2);
    }

    #[test]
    fn test_failed_refresh_serves_last_known_good() {
        let store = FlakyStore::new(seeded_store());
        let mut cache = SnapshotCache::with_ttl(Duration::ZERO);

        assert!(cache.get(&store).fetch_error.is_none());

        store.fail_fetch.set(true);
        let read = cache.get(&store);
        assert!(matches!(read.fetch_error, Some(Error::Fetch(_))));
        // Stale but present: the view stays usable
        assert_eq!(read.snapshot.tasks().len(), 1);
    }

    #[test]
    fn test_first_fetch_failure_yields_empty_snapshot() {
        let store = FlakyStore::new(seeded_store());
        store.fail_fetch.set(true);
        let mut cache = SnapshotCache::new();

        let read = cache.get(&store);
        assert!(read.fetch_error.is_some());
        assert!(read.snapshot.tasks().is_empty());
        // The fallback was served, not cached
        assert!(!cache.is_populated());
    }

    #[test]
    fn test_failed_first_fetch_retries_until_store_recovers() {
        let store = FlakyStore::new(seeded_store());
        store.fail_fetch.set(true);
        // Long TTL: only the never-cached fallback forces the retry
        let mut cache = SnapshotCache::with_ttl(Duration::from_secs(3600));

        // Every read during the outage reports the failure and retries
        assert!(cache.get(&store).fetch_error.is_some());
        assert!(cache.get(&store).fetch_error.is_some());
        assert_eq!(store.fetches.get(), 2);

        store.fail_fetch.set(false);
        let read = cache.get(&store);
        assert!(read.fetch_error.is_none());
        assert_eq!(read.snapshot.tasks().len(), 1);
        assert_eq!(store.fetches.get(), 3);
    }

    #[test]
    fn test_malformed_rows_are_skipped_from_view() {
        let task = Task::new("Good", "", "alice", "bob");
        let store = InMemoryRowStore::with_rows(vec![
            vec!["junk".to_string()],
            task.to_row(),
        ]);
        let mut cache = SnapshotCache::new();

        let read = cache.get(&store);
        assert_eq!(read.snapshot.tasks().len(), 1);
        assert_eq!(read.snapshot.tasks()[0].title, "Good");
    }
}

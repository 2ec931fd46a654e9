//! Explicit session state: one user, one cache, one buffer, one store handle
//!
//! Everything the interaction layer needs goes through a `Session` value;
//! there is no ambient global state. Dropping the session discards whatever
//! is still staged (logout).

use crate::cache::SnapshotCache;
use crate::error::{Error, Result};
use crate::models::{Task, TaskField, TaskId, User};
use crate::overlay::{project, TaskFilter};
use crate::reconcile::{commit, CommitReport};
use crate::staging::{PendingChangeBuffer, TaskDraft};
use crate::store::RowStore;

/// A projected task list plus the refresh error, when the underlying
/// snapshot is stale because its refresh failed
#[derive(Debug)]
pub struct TaskView {
    pub tasks: Vec<Task>,
    pub fetch_error: Option<Error>,
}

/// One authenticated client session over the shared tasks table
#[derive(Debug)]
pub struct Session<S: RowStore> {
    user: User,
    store: S,
    cache: SnapshotCache,
    buffer: PendingChangeBuffer,
}

impl<S: RowStore> Session<S> {
    /// Start a session for an authenticated user
    #[must_use]
    pub fn new(user: User, store: S) -> Self {
        Self {
            user,
            store,
            cache: SnapshotCache::new(),
            buffer: PendingChangeBuffer::new(),
        }
    }

    /// Start a session with an explicit snapshot TTL
    #[must_use]
    pub fn with_cache(user: User, store: S, cache: SnapshotCache) -> Self {
        Self {
            user,
            store,
            cache,
            buffer: PendingChangeBuffer::new(),
        }
    }

    /// The authenticated user
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// The merged view of committed state plus this session's pending edits
    pub fn tasks(&mut self, filter: Option<&TaskFilter>) -> TaskView {
        let read = self.cache.get(&self.store);
        TaskView {
            tasks: project(read.snapshot, &self.buffer, filter),
            fetch_error: read.fetch_error,
        }
    }

    /// Stage a new task, created by this session's user
    pub fn stage_insert(&mut self, draft: TaskDraft) -> TaskId {
        self.buffer.stage_insert(draft, &self.user.username)
    }

    /// Stage a field update against the current effective view
    pub fn stage_update(&mut self, id: &TaskId, field: TaskField, value: &str) -> Result<()> {
        let read = self.cache.get(&self.store);
        self.buffer.stage_update(read.snapshot, id, field, value)
    }

    /// Stage marking a task done
    pub fn mark_done(&mut self, id: &TaskId) -> Result<()> {
        self.stage_update(id, TaskField::Status, "Done")
    }

    /// Stage a deletion
    pub fn stage_delete(&mut self, id: &TaskId) {
        self.buffer.stage_delete(id);
    }

    /// Discard every staged change for an id
    pub fn discard(&mut self, id: &TaskId) {
        self.buffer.discard(id);
    }

    /// Whether anything is staged; gates offering a commit
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Number of staged changes
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.buffer.pending_count()
    }

    /// Commit the staged batch to the store
    pub fn commit(&mut self) -> CommitReport {
        commit(&mut self.store, &mut self.cache, &mut self.buffer)
    }

    /// Force the next read to refetch from the store
    pub fn refresh(&mut self) {
        self.cache.invalidate();
    }

    /// The staged buffer, read-only (for rendering pending markers)
    #[must_use]
    pub const fn buffer(&self) -> &PendingChangeBuffer {
        &self.buffer
    }

    /// Direct store access, for collaborators sharing the handle
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

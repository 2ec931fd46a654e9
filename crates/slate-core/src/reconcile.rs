//! Reconciliation: committing the pending change buffer to the row store
//!
//! Three phases run in a fixed order: insertions, deletions, updates. Each
//! phase that needs physical positions rebuilds its identity index from a
//! fetch taken at the start of that phase, because other sessions may have
//! shifted positions since the last read. Deletions apply from the highest
//! position down; any other order invalidates positions already resolved for
//! the remaining deletions in the same phase.
//!
//! Items that fail stay staged so the user can retry or discard them; items
//! that succeed are drained immediately. A commit never raises: every outcome
//! travels in the [`CommitReport`].

use crate::cache::SnapshotCache;
use crate::error::Error;
use crate::models::{Task, TaskField, TaskId};
use crate::resolve::IdIndex;
use crate::staging::PendingChangeBuffer;
use crate::store::RowStore;

/// Which reconciliation phase an item belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    Insert,
    Delete,
    Update,
}

/// One staged item that could not be applied and remains staged
#[derive(Debug)]
pub struct CommitFailure {
    pub phase: CommitPhase,
    pub id: TaskId,
    pub error: Error,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Records appended to the store
    pub inserted: usize,
    /// Rows deleted from the store
    pub deleted: usize,
    /// Individual cells written by the update phase
    pub updated_cells: usize,
    /// Ids whose pending change was dropped because the record no longer
    /// exists in the store (deleted by someone else)
    pub skipped_missing: Vec<TaskId>,
    /// Items that failed and are still staged
    pub failures: Vec<CommitFailure>,
}

impl CommitReport {
    /// True iff every staged item was applied or knowingly dropped
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total store writes applied
    #[must_use]
    pub const fn applied(&self) -> usize {
        self.inserted + self.deleted + self.updated_cells
    }
}

/// Commit the buffer to the store.
///
/// Committing an empty buffer is a complete no-op: no store I/O and no cache
/// invalidation. Otherwise the cache is invalidated after the phases run,
/// regardless of per-item failures.
pub fn commit(
    store: &mut dyn RowStore,
    cache: &mut SnapshotCache,
    buffer: &mut PendingChangeBuffer,
) -> CommitReport {
    let mut report = CommitReport::default();

    if buffer.is_empty() {
        return report;
    }

    apply_insertions(store, buffer, &mut report);
    apply_deletions(store, buffer, &mut report);
    apply_updates(store, buffer, &mut report);

    cache.invalidate();
    tracing::info!(
        "commit applied {} changes ({} skipped as already gone, {} failed)",
        report.applied(),
        report.skipped_missing.len(),
        report.failures.len()
    );
    report
}

/// Phase 1: append all staged records as one batch.
///
/// A failed batch is treated as not applied; every insertion stays staged and
/// is reported individually. Retrying item-by-item after a failed batch could
/// double-apply against a store that applied it partially.
fn apply_insertions(
    store: &mut dyn RowStore,
    buffer: &mut PendingChangeBuffer,
    report: &mut CommitReport,
) {
    if buffer.insertions.is_empty() {
        return;
    }

    let rows = buffer.insertions.iter().map(Task::to_row).collect();
    match store.append_rows(rows) {
        Ok(()) => {
            report.inserted = buffer.insertions.len();
            buffer.insertions.clear();
        }
        Err(error) => {
            tracing::warn!("insert phase failed, keeping batch staged: {error}");
            let message = error.to_string();
            for task in &buffer.insertions {
                report.failures.push(CommitFailure {
                    phase: CommitPhase::Insert,
                    id: task.id.clone(),
                    error: Error::Store(message.clone()),
                });
            }
        }
    }
}

/// Phase 2: resolve staged deletions against a fresh fetch, then delete from
/// the highest physical position to the lowest.
fn apply_deletions(
    store: &mut dyn RowStore,
    buffer: &mut PendingChangeBuffer,
    report: &mut CommitReport,
) {
    if buffer.deletions.is_empty() {
        return;
    }

    let rows = match store.fetch_all_rows() {
        Ok(rows) => rows,
        Err(error) => {
            fail_whole_phase(CommitPhase::Delete, buffer.deletions.iter(), &error, report);
            return;
        }
    };
    let index = IdIndex::build(&rows);

    let mut resolved: Vec<(usize, TaskId)> = Vec::new();
    for id in buffer.deletions.clone() {
        match index.resolve(&id) {
            Some(position) => resolved.push((position, id)),
            None => {
                // Already deleted by someone else; nothing left to do
                buffer.deletions.remove(&id);
                report.skipped_missing.push(id);
            }
        }
    }

    // Top-down: each deletion shifts every row below it
    resolved.sort_by(|a, b| b.0.cmp(&a.0));

    for (position, id) in resolved {
        match store.delete_row(position) {
            Ok(()) => {
                buffer.deletions.remove(&id);
                report.deleted += 1;
            }
            Err(error) => report.failures.push(CommitFailure {
                phase: CommitPhase::Delete,
                id,
                error,
            }),
        }
    }
}

/// Phase 3: resolve staged updates against the post-deletion state and write
/// each changed field as one cell.
fn apply_updates(
    store: &mut dyn RowStore,
    buffer: &mut PendingChangeBuffer,
    report: &mut CommitReport,
) {
    if buffer.updates.is_empty() {
        return;
    }

    let rows = match store.fetch_all_rows() {
        Ok(rows) => rows,
        Err(error) => {
            fail_whole_phase(CommitPhase::Update, buffer.updates.keys(), &error, report);
            return;
        }
    };
    let index = IdIndex::build(&rows);

    let ids: Vec<TaskId> = buffer.updates.keys().cloned().collect();
    for id in ids {
        let Some(position) = index.resolve(&id) else {
            buffer.updates.remove(&id);
            report.skipped_missing.push(id);
            continue;
        };

        let Some(fields) = buffer.updates.get_mut(&id) else {
            continue;
        };
        let staged: Vec<(TaskField, String)> = fields
            .iter()
            .map(|(field, value)| (*field, value.clone()))
            .collect();

        for (field, value) in staged {
            match store.update_cell(position, field.column(), &value) {
                Ok(()) => {
                    fields.remove(&field);
                    report.updated_cells += 1;
                }
                Err(error) => report.failures.push(CommitFailure {
                    phase: CommitPhase::Update,
                    id: id.clone(),
                    error,
                }),
            }
        }

        if fields.is_empty() {
            buffer.updates.remove(&id);
        }
    }
}

/// A phase whose identity fetch failed leaves all of its items staged
fn fail_whole_phase<'a>(
    phase: CommitPhase,
    ids: impl Iterator<Item = &'a TaskId>,
    error: &Error,
    report: &mut CommitReport,
) {
    tracing::warn!("{phase:?} phase could not fetch fresh positions: {error}");
    let message = error.to_string();
    for id in ids {
        report.failures.push(CommitFailure {
            phase,
            id: id.clone(),
            error: Error::Fetch(message.clone()),
        });
    }
}

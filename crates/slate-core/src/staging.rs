//! Per-session pending change buffer
//!
//! Three disjoint change sets staged locally, with no store I/O: full records
//! pending insertion, field-level updates keyed by id, and pending deletions.
//! The buffer lives for the session and is drained only by a successful
//! reconciliation pass.

use std::collections::{BTreeMap, BTreeSet};

use crate::cache::Snapshot;
use crate::error::Result;
use crate::models::{Task, TaskField, TaskId};

/// Fields supplied by the caller when staging a new task
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
}

/// Staged, uncommitted edits for one session.
///
/// Invariants: an id staged for insertion never appears in `updates` or
/// `deletions` (edits fold into the staged record, deletion discards it);
/// staging a deletion drops any staged updates for that id.
#[derive(Debug, Default)]
pub struct PendingChangeBuffer {
    pub(crate) insertions: Vec<Task>,
    pub(crate) updates: BTreeMap<TaskId, BTreeMap<TaskField, String>>,
    pub(crate) deletions: BTreeSet<TaskId>,
}

impl PendingChangeBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new task for insertion and return its freshly generated id
    pub fn stage_insert(&mut self, draft: TaskDraft, created_by: &str) -> TaskId {
        let mut task = Task::new(draft.title, draft.description, draft.assigned_to, created_by);
        if let Some(deadline) = draft.deadline {
            task = task.with_deadline(deadline);
        }
        let id = task.id.clone();
        self.insertions.push(task);
        id
    }

    /// Stage a field update.
    ///
    /// Edits to a task that is itself staged for insertion mutate the staged
    /// record directly. Updates to an id staged for deletion are discarded.
    /// Setting a field to its currently effective value (as seen through the
    /// overlay) records nothing, so commits never write redundant cells.
    pub fn stage_update(
        &mut self,
        snapshot: &Snapshot,
        id: &TaskId,
        field: TaskField,
        value: &str,
    ) -> Result<()> {
        field.validate(value)?;

        if self.deletions.contains(id) {
            return Ok(());
        }

        if let Some(staged) = self.insertions.iter_mut().find(|task| &task.id == id) {
            return staged.set_field(field, value);
        }

        let effective = self
            .updates
            .get(id)
            .and_then(|fields| fields.get(&field))
            .cloned()
            .or_else(|| snapshot.task(id).map(|task| task.field_value(field)));
        if effective.as_deref() == Some(value) {
            return Ok(());
        }

        self.updates
            .entry(id.clone())
            .or_default()
            .insert(field, value.to_string());
        Ok(())
    }

    /// Stage a deletion.
    ///
    /// A task still pending insertion is simply discarded; it never had a
    /// physical row to delete. Otherwise the id joins the deletion set and
    /// any staged updates for it become moot and are dropped.
    pub fn stage_delete(&mut self, id: &TaskId) {
        if let Some(position) = self.insertions.iter().position(|task| &task.id == id) {
            self.insertions.remove(position);
            return;
        }

        self.updates.remove(id);
        self.deletions.insert(id.clone());
    }

    /// Discard every staged change for an id, with no external effect
    pub fn discard(&mut self, id: &TaskId) {
        self.insertions.retain(|task| &task.id != id);
        self.updates.remove(id);
        self.deletions.remove(id);
    }

    /// True iff nothing is staged; gates whether a commit is offered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }

    /// Number of staged changes (one per inserted record, updated record, or
    /// deleted record)
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.insertions.len() + self.updates.len() + self.deletions.len()
    }

    /// Reset all three sets to empty
    pub fn clear(&mut self) {
        self.insertions.clear();
        self.updates.clear();
        self.deletions.clear();
    }

    /// Records pending insertion
    #[must_use]
    pub fn insertions(&self) -> &[Task] {
        &self.insertions
    }

    /// Staged field updates by id
    #[must_use]
    pub const fn updates(&self) -> &BTreeMap<TaskId, BTreeMap<TaskField, String>> {
        &self.updates
    }

    /// Ids staged for deletion
    #[must_use]
    pub const fn deletions(&self) -> &BTreeSet<TaskId> {
        &self.deletions
    }
}

//! Overlay view: pending edits layered on the committed snapshot
//!
//! A pure projection with no I/O, safe to call on every render: staged
//! deletions filter committed rows out, staged field values win over
//! committed ones, and staged insertions appear as virtual rows.

use crate::cache::Snapshot;
use crate::models::{Task, TaskStatus, BROADCAST_ASSIGNEE};
use crate::staging::PendingChangeBuffer;

/// Predicate over projected tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Keep only tasks with this status
    pub status: Option<TaskStatus>,
    /// Keep only tasks assigned to this user (or broadcast to everyone)
    pub assigned_to: Option<String>,
}

impl TaskFilter {
    /// Filter by status only
    #[must_use]
    pub const fn by_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            assigned_to: None,
        }
    }

    /// Filter to one assignee's view (their tasks plus broadcast tasks)
    #[must_use]
    pub fn for_assignee(username: impl Into<String>) -> Self {
        Self {
            status: None,
            assigned_to: Some(username.into()),
        }
    }

    fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(assignee) = &self.assigned_to {
            if task.assigned_to != *assignee && task.assigned_to != BROADCAST_ASSIGNEE {
                return false;
            }
        }
        true
    }
}

/// Project the merged view of committed state plus pending edits.
///
/// The result is deterministically ordered: by deadline ascending with absent
/// deadlines last, then Pending before Done, then creation time ascending.
/// Repeated projections of unchanged state render identically.
#[must_use]
pub fn project(
    snapshot: &Snapshot,
    buffer: &PendingChangeBuffer,
    filter: Option<&TaskFilter>,
) -> Vec<Task> {
    let mut tasks: Vec<Task> = snapshot
        .tasks()
        .iter()
        .filter(|task| !buffer.deletions().contains(&task.id))
        .map(|task| apply_staged_updates(task, buffer))
        .collect();

    tasks.extend(buffer.insertions().iter().cloned());

    if let Some(filter) = filter {
        tasks.retain(|task| filter.matches(task));
    }

    sort_for_display(&mut tasks);
    tasks
}

fn apply_staged_updates(task: &Task, buffer: &PendingChangeBuffer) -> Task {
    let mut merged = task.clone();
    if let Some(fields) = buffer.updates().get(&task.id) {
        for (field, value) in fields {
            // Values were validated at staging time
            if let Err(error) = merged.set_field(*field, value) {
                tracing::warn!("dropping unreadable staged value for {field}: {error}");
            }
        }
    }
    merged
}

fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        deadline_key(a)
            .cmp(&deadline_key(b))
            .then_with(|| a.status.cmp(&b.status))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// Absent deadlines sort as infinitely far in the future
fn deadline_key(task: &Task) -> (bool, Option<chrono::DateTime<chrono::Utc>>) {
    (task.deadline.is_none(), task.deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_timestamp, TaskField};
    use crate::staging::TaskDraft;
    use pretty_assertions::assert_eq;

    fn task(title: &str, assigned_to: &str) -> Task {
        Task::new(title, "", assigned_to, "head")
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.title.as_str()).collect()
    }

    #[test]
    fn test_deleted_ids_never_appear() {
        let kept = task("Kept", "alice");
        let dropped = task("Dropped", "alice");
        let dropped_id = dropped.id.clone();
        let snapshot = Snapshot::from_tasks(vec![kept, dropped]);

        let mut buffer = PendingChangeBuffer::new();
        buffer.stage_delete(&dropped_id);

        let view = project(&snapshot, &buffer, None);
        assert_eq!(titles(&view), vec!["Kept"]);
    }

    #[test]
    fn test_staged_value_wins_over_committed() {
        let committed = task("Committed", "alice");
        let id = committed.id.clone();
        let snapshot = Snapshot::from_tasks(vec![committed]);

        let mut buffer = PendingChangeBuffer::new();
        buffer
            .stage_update(&snapshot, &id, TaskField::Title, "Staged")
            .unwrap();

        let view = project(&snapshot, &buffer, None);
        assert_eq!(titles(&view), vec!["Staged"]);
    }

    #[test]
    fn test_insertions_appear_as_virtual_rows() {
        let snapshot = Snapshot::from_tasks(vec![task("Committed", "alice")]);
        let mut buffer = PendingChangeBuffer::new();
        buffer.stage_insert(
            TaskDraft {
                title: "Virtual".to_string(),
                assigned_to: "alice".to_string(),
                ..TaskDraft::default()
            },
            "head",
        );

        let view = project(&snapshot, &buffer, None);
        assert_eq!(view.len(), 2);
        assert!(view.iter().any(|t| t.title == "Virtual"));
    }

    #[test]
    fn test_sort_triple_deadline_status_created() {
        let mut a = task("Jan", "alice");
        a.deadline = Some(parse_timestamp("2025-01-01 10:00").unwrap());
        let mut b = task("NoDeadline", "alice");
        b.deadline = None;
        let mut c = task("Dec", "alice");
        c.deadline = Some(parse_timestamp("2024-12-01 09:00").unwrap());
        c.status = TaskStatus::Done;

        let snapshot = Snapshot::from_tasks(vec![a, b, c]);
        let view = project(&snapshot, &PendingChangeBuffer::new(), None);

        // Empty deadline sorts last, regardless of status
        assert_eq!(titles(&view), vec!["Dec", "Jan", "NoDeadline"]);
    }

    #[test]
    fn test_equal_deadlines_order_pending_before_done() {
        let deadline = parse_timestamp("2025-03-01 08:00").unwrap();
        let mut done = task("Done", "alice");
        done.deadline = Some(deadline);
        done.status = TaskStatus::Done;
        let mut pending = task("Pending", "alice");
        pending.deadline = Some(deadline);

        let snapshot = Snapshot::from_tasks(vec![done, pending]);
        let view = project(&snapshot, &PendingChangeBuffer::new(), None);
        assert_eq!(titles(&view), vec!["Pending", "Done"]);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let snapshot = Snapshot::from_tasks(vec![
            task("One", "alice"),
            task("Two", "bob"),
            task("Three", "alice"),
        ]);
        let buffer = PendingChangeBuffer::new();

        let first = project(&snapshot, &buffer, None);
        let second = project(&snapshot, &buffer, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_status_filter() {
        let mut done = task("Done", "alice");
        done.status = TaskStatus::Done;
        let snapshot = Snapshot::from_tasks(vec![task("Open", "alice"), done]);

        let view = project(
            &snapshot,
            &PendingChangeBuffer::new(),
            Some(&TaskFilter::by_status(TaskStatus::Done)),
        );
        assert_eq!(titles(&view), vec!["Done"]);
    }

    #[test]
    fn test_assignee_filter_includes_broadcast() {
        let snapshot = Snapshot::from_tasks(vec![
            task("Mine", "alice"),
            task("Everyones", BROADCAST_ASSIGNEE),
            task("Not mine", "bob"),
        ]);

        let view = project(
            &snapshot,
            &PendingChangeBuffer::new(),
            Some(&TaskFilter::for_assignee("alice")),
        );
        let mut seen = titles(&view);
        seen.sort_unstable();
        assert_eq!(seen, vec!["Everyones", "Mine"]);
    }

    #[test]
    fn test_projection_never_mutates_inputs() {
        let committed = task("Committed", "alice");
        let id = committed.id.clone();
        let snapshot = Snapshot::from_tasks(vec![committed.clone()]);
        let mut buffer = PendingChangeBuffer::new();
        buffer
            .stage_update(&snapshot, &id, TaskField::Title, "Staged")
            .unwrap();

        let _ = project(&snapshot, &buffer, None);
        assert_eq!(snapshot.task(&id), Some(&committed));
        assert_eq!(buffer.pending_count(), 1);
    }
}

//! Identity resolution: logical id to physical row position
//!
//! The store has no secondary index, so the only way to address a record is
//! to scan a freshly fetched row sequence for its id. Positions shift under
//! concurrent inserts and deletes, which makes a stale mapping a correctness
//! bug: reconciliation rebuilds the index from a fresh fetch before every
//! phase that needs positions, and never reuses one across commits.

use std::collections::HashMap;

use crate::models::TaskId;
use crate::store::Row;

/// Column holding the logical id in the tasks table
const ID_COLUMN: usize = 0;

/// One-scan map from logical id to physical position, valid only against the
/// exact row sequence it was built from.
///
/// Built over raw rows rather than parsed tasks: a row the snapshot cannot
/// decode still occupies its physical position.
#[derive(Debug)]
pub struct IdIndex {
    positions: HashMap<TaskId, usize>,
}

impl IdIndex {
    /// Build the index by scanning the rows once
    #[must_use]
    pub fn build(rows: &[Row]) -> Self {
        let positions = rows
            .iter()
            .enumerate()
            .filter_map(|(position, row)| {
                row.get(ID_COLUMN)
                    .map(|id| (TaskId::from(id.as_str()), position))
            })
            .collect();
        Self { positions }
    }

    /// Resolve a logical id to its physical position, if it still exists
    #[must_use]
    pub fn resolve(&self, id: &TaskId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Number of indexed rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the indexed table was empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> Row {
        vec![id.to_string(), "title".to_string()]
    }

    #[test]
    fn test_resolve_maps_id_to_position() {
        let index = IdIndex::build(&[row("a"), row("b"), row("c")]);
        assert_eq!(index.resolve(&TaskId::from("a")), Some(0));
        assert_eq!(index.resolve(&TaskId::from("c")), Some(2));
        assert_eq!(index.resolve(&TaskId::from("missing")), None);
    }

    #[test]
    fn test_rebuild_after_shift() {
        // Deleting "a" shifts everything below it up by one; a rebuilt index
        // must reflect the new positions.
        let index = IdIndex::build(&[row("b"), row("c")]);
        assert_eq!(index.resolve(&TaskId::from("b")), Some(0));
        assert_eq!(index.resolve(&TaskId::from("c")), Some(1));
    }

    #[test]
    fn test_empty_and_unreadable_rows() {
        let index = IdIndex::build(&[Vec::new(), row("a")]);
        assert_eq!(index.len(), 1);
        // The empty row still occupies position 0
        assert_eq!(index.resolve(&TaskId::from("a")), Some(1));
    }
}

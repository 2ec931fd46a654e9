//! In-memory row store, used by tests and demos

use crate::error::{Error, Result};
use crate::store::{Row, RowStore};

/// A positional table held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryRowStore {
    rows: Vec<Row>,
}

impl InMemoryRowStore {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table pre-seeded with rows
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Direct view of the stored rows, for inspection in tests
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl RowStore for InMemoryRowStore {
    fn fetch_all_rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }

    fn append_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        self.rows.extend(rows);
        Ok(())
    }

    fn update_cell(&mut self, position: usize, column: usize, value: &str) -> Result<()> {
        let row = self
            .rows
            .get_mut(position)
            .ok_or_else(|| Error::Store(format!("no row at position {position}")))?;
        let cell = row
            .get_mut(column)
            .ok_or_else(|| Error::Store(format!("no column {column} at position {position}")))?;
        *cell = value.to_string();
        Ok(())
    }

    fn delete_row(&mut self, position: usize) -> Result<()> {
        if position >= self.rows.len() {
            return Err(Error::Store(format!("no row at position {position}")));
        }
        self.rows.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_append_and_fetch_preserve_order() {
        let mut store = InMemoryRowStore::new();
        store
            .append_rows(vec![row(&["a", "1"]), row(&["b", "2"])])
            .unwrap();
        let rows = store.fetch_all_rows().unwrap();
        assert_eq!(rows, vec![row(&["a", "1"]), row(&["b", "2"])]);
    }

    #[test]
    fn test_delete_shifts_positions() {
        let mut store =
            InMemoryRowStore::with_rows(vec![row(&["a"]), row(&["b"]), row(&["c"])]);
        store.delete_row(1).unwrap();
        assert_eq!(store.rows(), &[row(&["a"]), row(&["c"])]);
    }

    #[test]
    fn test_update_cell_out_of_bounds() {
        let mut store = InMemoryRowStore::with_rows(vec![row(&["a"])]);
        assert!(store.update_cell(3, 0, "x").is_err());
        assert!(store.update_cell(0, 9, "x").is_err());
    }
}

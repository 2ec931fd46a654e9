//! JSON-file-backed row store
//!
//! Each table is one JSON file holding an array of rows. Every operation
//! re-reads the file and mutations rewrite it whole, so separate processes
//! sharing the file observe last-committer-wins, the same contract as a
//! remote positional store.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::{Row, RowStore};

/// A positional table persisted as a JSON file
#[derive(Debug, Clone)]
pub struct FileRowStore {
    path: PathBuf,
}

impl FileRowStore {
    /// Open a table at the given path, creating parent directories.
    ///
    /// A missing file reads as an empty table; it is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Row>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(Error::Serialization),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(Error::Io(error)),
        }
    }

    fn save(&self, rows: &[Row]) -> Result<()> {
        // Write-then-rename so a crash mid-write never truncates the table
        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(rows)?;
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl RowStore for FileRowStore {
    fn fetch_all_rows(&self) -> Result<Vec<Row>> {
        self.load()
    }

    fn append_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        let mut stored = self.load()?;
        stored.extend(rows);
        self.save(&stored)
    }

    fn update_cell(&mut self, position: usize, column: usize, value: &str) -> Result<()> {
        let mut stored = self.load()?;
        let row = stored
            .get_mut(position)
            .ok_or_else(|| Error::Store(format!("no row at position {position}")))?;
        let cell = row
            .get_mut(column)
            .ok_or_else(|| Error::Store(format!("no column {column} at position {position}")))?;
        *cell = value.to_string();
        self.save(&stored)
    }

    fn delete_row(&mut self, position: usize) -> Result<()> {
        let mut stored = self.load()?;
        if position >= stored.len() {
            return Err(Error::Store(format!("no row at position {position}")));
        }
        stored.remove(position);
        self.save(&stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRowStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(store.fetch_all_rows().unwrap().is_empty());
    }

    #[test]
    fn test_append_update_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileRowStore::open(dir.path().join("tasks.json")).unwrap();

        store
            .append_rows(vec![row(&["a", "1"]), row(&["b", "2"]), row(&["c", "3"])])
            .unwrap();
        store.update_cell(1, 1, "two").unwrap();
        store.delete_row(0).unwrap();

        let rows = store.fetch_all_rows().unwrap();
        assert_eq!(rows, vec![row(&["b", "two"]), row(&["c", "3"])]);
    }

    #[test]
    fn test_two_handles_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut writer = FileRowStore::open(&path).unwrap();
        let reader = FileRowStore::open(&path).unwrap();

        writer.append_rows(vec![row(&["a"])]).unwrap();
        assert_eq!(reader.fetch_all_rows().unwrap(), vec![row(&["a"])]);
    }

    #[test]
    fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = FileRowStore::open(&path).unwrap();
        assert!(matches!(
            store.fetch_all_rows(),
            Err(Error::Serialization(_))
        ));
    }
}

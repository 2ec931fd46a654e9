//! Row-store client boundary
//!
//! The backing store is a positionally addressed table with no native
//! transactions and no secondary index: rows are plain cell vectors, and a
//! row's physical position shifts whenever rows above it are inserted or
//! deleted. Everything above this trait works in terms of logical ids and
//! treats positions as ephemeral.

mod file;
mod memory;

pub use file::FileRowStore;
pub use memory::InMemoryRowStore;

use crate::error::Result;

/// One stored row: an ordered sequence of cells
pub type Row = Vec<String>;

/// Column order of the tasks table
pub const TASK_COLUMNS: [&str; 8] = [
    "id",
    "title",
    "description",
    "assignedTo",
    "createdBy",
    "status",
    "createdAt",
    "deadline",
];

/// Column order of the users table
pub const USER_COLUMNS: [&str; 3] = ["username", "role", "credential"];

/// Client for one positionally addressed table.
///
/// Positions are zero-based indices into the sequence returned by
/// [`fetch_all_rows`](Self::fetch_all_rows); they are only meaningful against
/// the fetch they came from.
pub trait RowStore {
    /// Fetch every row in physical order
    fn fetch_all_rows(&self) -> Result<Vec<Row>>;

    /// Append rows at the end of the table as one batch
    fn append_rows(&mut self, rows: Vec<Row>) -> Result<()>;

    /// Overwrite a single cell of the row at `position`
    fn update_cell(&mut self, position: usize, column: usize, value: &str) -> Result<()>;

    /// Delete the row at `position`, shifting every row below it up by one
    fn delete_row(&mut self, position: usize) -> Result<()>;
}

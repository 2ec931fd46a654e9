//! Task model and its row-store wire encoding

use chrono::{DateTime, DurationRound, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::TASK_COLUMNS;

/// Timestamp format used by the row store's cells
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Assignee value meaning "visible to every coordinator"
pub const BROADCAST_ASSIGNEE: &str = "All";

/// Opaque logical identifier for a task, stable for the life of the record.
///
/// Newly staged tasks get a UUID v7 (time-sortable); ids read back from the
/// store are accepted verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a new unique task ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Completion status of a task. `Pending` orders before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    /// Wire string as stored in the status cell
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
        }
    }

    /// Parse a status cell value
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Done" => Ok(Self::Done),
            other => Err(Error::InvalidInput(format!("Unknown status: {other}"))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task in the shared tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique logical identifier
    pub id: TaskId,
    /// Short title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Username of the assignee, or [`BROADCAST_ASSIGNEE`]
    pub assigned_to: String,
    /// Username of the creator
    pub created_by: String,
    /// Completion status
    pub status: TaskStatus,
    /// Creation time, set once when staged
    pub created_at: DateTime<Utc>,
    /// Optional deadline; `None` means no deadline
    pub deadline: Option<DateTime<Utc>>,
}

/// Mutable task fields addressable by a staged cell update.
///
/// `id` and `created_at` are immutable once assigned, and `created_by` is
/// fixed at creation, so none of them appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskField {
    Title,
    Description,
    AssignedTo,
    Status,
    Deadline,
}

impl TaskField {
    /// Zero-based column index of this field in the tasks table
    #[must_use]
    pub const fn column(self) -> usize {
        match self {
            Self::Title => 1,
            Self::Description => 2,
            Self::AssignedTo => 3,
            Self::Status => 5,
            Self::Deadline => 7,
        }
    }

    /// Column name, taken from the store's header layout
    #[must_use]
    pub const fn name(self) -> &'static str {
        TASK_COLUMNS[self.column()]
    }

    /// Check that `value` is a valid wire value for this field
    pub fn validate(self, value: &str) -> Result<()> {
        match self {
            Self::Title | Self::Description | Self::AssignedTo => Ok(()),
            Self::Status => TaskStatus::parse(value).map(|_| ()),
            Self::Deadline => parse_optional_timestamp(value).map(|_| ()),
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Task {
    /// Create a new pending task, stamped with the current time
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: description.into(),
            assigned_to: assigned_to.into(),
            created_by: created_by.into(),
            status: TaskStatus::Pending,
            // The wire format keeps minute precision only
            created_at: wire_now(),
            deadline: None,
        }
    }

    /// Set a deadline on a freshly built task
    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Current wire value of a mutable field
    #[must_use]
    pub fn field_value(&self, field: TaskField) -> String {
        match field {
            TaskField::Title => self.title.clone(),
            TaskField::Description => self.description.clone(),
            TaskField::AssignedTo => self.assigned_to.clone(),
            TaskField::Status => self.status.as_str().to_string(),
            TaskField::Deadline => self
                .deadline
                .map(|deadline| format_timestamp(&deadline))
                .unwrap_or_default(),
        }
    }

    /// Apply a wire value to a mutable field
    pub fn set_field(&mut self, field: TaskField, value: &str) -> Result<()> {
        match field {
            TaskField::Title => self.title = value.to_string(),
            TaskField::Description => self.description = value.to_string(),
            TaskField::AssignedTo => self.assigned_to = value.to_string(),
            TaskField::Status => self.status = TaskStatus::parse(value)?,
            TaskField::Deadline => self.deadline = parse_optional_timestamp(value)?,
        }
        Ok(())
    }

    /// Encode as a row in the tasks table column order
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.description.clone(),
            self.assigned_to.clone(),
            self.created_by.clone(),
            self.status.as_str().to_string(),
            format_timestamp(&self.created_at),
            self.deadline
                .map(|deadline| format_timestamp(&deadline))
                .unwrap_or_default(),
        ]
    }

    /// Decode a row in the tasks table column order
    pub fn from_row(row: &[String]) -> Result<Self> {
        if row.len() != TASK_COLUMNS.len() {
            return Err(Error::MalformedRow(format!(
                "expected {} task cells, got {}",
                TASK_COLUMNS.len(),
                row.len()
            )));
        }

        Ok(Self {
            id: TaskId::from(row[0].as_str()),
            title: row[1].clone(),
            description: row[2].clone(),
            assigned_to: row[3].clone(),
            created_by: row[4].clone(),
            status: TaskStatus::parse(&row[5])
                .map_err(|error| Error::MalformedRow(error.to_string()))?,
            created_at: parse_timestamp(&row[6])
                .map_err(|error| Error::MalformedRow(error.to_string()))?,
            deadline: parse_optional_timestamp(&row[7])
                .map_err(|error| Error::MalformedRow(error.to_string()))?,
        })
    }
}

/// Current time truncated to the minute, matching wire precision
#[must_use]
pub fn wire_now() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now)
}

/// Format a timestamp the way the store's cells expect it
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(WIRE_TIMESTAMP_FORMAT).to_string()
}

/// Parse a non-empty timestamp cell
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, WIRE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|error| Error::InvalidInput(format!("Bad timestamp {value:?}: {error}")))
}

/// Parse a timestamp cell where the empty string means "absent"
pub fn parse_optional_timestamp(value: &str) -> Result<Option<DateTime<Utc>>> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_timestamp(value).map(Some)
    }
}

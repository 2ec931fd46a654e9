//! Data models for Slate

mod task;
mod user;

pub use task::{
    format_timestamp, parse_optional_timestamp, parse_timestamp, wire_now, Task, TaskField, TaskId,
    TaskStatus, BROADCAST_ASSIGNEE, WIRE_TIMESTAMP_FORMAT,
};
pub use user::{Role, User};

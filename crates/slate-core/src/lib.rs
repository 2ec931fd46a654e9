//! slate-core - Core library for Slate
//!
//! This crate contains the shared models, the row-store boundary, and the
//! optimistic staging layer used by all Slate interfaces: per-session pending
//! edits, the merged overlay view, and the position-safe reconciliation pass
//! that commits a staged batch to a store with no native transactions.

pub mod auth;
pub mod cache;
pub mod error;
pub mod models;
pub mod overlay;
pub mod reconcile;
pub mod resolve;
pub mod session;
pub mod staging;
pub mod store;

pub use error::{Error, Result};
pub use models::{Role, Task, TaskField, TaskId, TaskStatus, User};
pub use session::Session;
pub use staging::{PendingChangeBuffer, TaskDraft};

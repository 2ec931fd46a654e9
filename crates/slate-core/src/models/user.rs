//! User model and the users-table wire encoding

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::store::USER_COLUMNS;

/// Role of a user in the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Works assigned tasks and can add broadcast tasks
    Coordinator,
    /// Assigns tasks and sees the full board
    Head,
}

impl Role {
    /// Wire string as stored in the role cell
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coordinator => "Coordinator",
            Self::Head => "Head",
        }
    }

    /// Parse a role cell value
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Coordinator" => Ok(Self::Coordinator),
            "Head" => Ok(Self::Head),
            other => Err(Error::InvalidInput(format!("Unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user. At most one row per username exists in the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique username
    pub username: String,
    /// Assigned role
    pub role: Role,
    /// Opaque secret, compared by exact match only
    pub credential: String,
}

impl User {
    /// Build a user record
    #[must_use]
    pub fn new(username: impl Into<String>, role: Role, credential: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role,
            credential: credential.into(),
        }
    }

    /// Encode as a row in the users table column order
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.role.as_str().to_string(),
            self.credential.clone(),
        ]
    }

    /// Decode a row in the users table column order
    pub fn from_row(row: &[String]) -> Result<Self> {
        if row.len() != USER_COLUMNS.len() {
            return Err(Error::MalformedRow(format!(
                "expected {} user cells, got {}",
                USER_COLUMNS.len(),
                row.len()
            )));
        }

        Ok(Self {
            username: row[0].clone(),
            role: Role::parse(&row[1]).map_err(|error| Error::MalformedRow(error.to_string()))?,
            credential: row[2].clone(),
        })
    }
}

impl fmt::Debug for User {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("User")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

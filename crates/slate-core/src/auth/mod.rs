//! User directory and credential verification over the users table
//!
//! Used at session start only. The users table is small and rarely written,
//! so reads go straight to the store with no snapshot cache in front.

use crate::error::{Error, Result};
use crate::models::{Role, User};
use crate::store::RowStore;

/// Result of a credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// The username has no row yet
    pub is_new: bool,
    /// The credential matched exactly (always false for new usernames)
    pub is_valid: bool,
    /// Role on file for a known username
    pub existing_role: Option<Role>,
}

/// Directory of registered users backed by the users table
#[derive(Debug)]
pub struct UserDirectory<S: RowStore> {
    store: S,
}

impl<S: RowStore> UserDirectory<S> {
    /// Wrap a users-table store handle
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Load every registered user.
    ///
    /// Rows that do not decode are skipped with a warning; one bad row must
    /// not lock everyone out.
    pub fn load_users(&self) -> Result<Vec<User>> {
        let rows = self.store.fetch_all_rows()?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(position, row)| match User::from_row(row) {
                Ok(user) => Some(user),
                Err(error) => {
                    tracing::warn!("skipping unreadable user row at position {position}: {error}");
                    None
                }
            })
            .collect())
    }

    /// Find a user by username
    pub fn find(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .load_users()?
            .into_iter()
            .find(|user| user.username == username))
    }

    /// Check a credential against the directory.
    ///
    /// An unknown username always comes back `is_new`; a known username is
    /// valid iff the credential matches exactly.
    pub fn verify(&self, username: &str, credential: &str) -> Result<VerifyOutcome> {
        Ok(match self.find(username)? {
            Some(user) => VerifyOutcome {
                is_new: false,
                is_valid: user.credential == credential,
                existing_role: Some(user.role),
            },
            None => VerifyOutcome {
                is_new: true,
                is_valid: false,
                existing_role: None,
            },
        })
    }

    /// Register a username if absent; return the stored record either way.
    ///
    /// Never overwrites an existing row, so a second registration attempt
    /// cannot change a role or credential.
    pub fn ensure_user(&mut self, username: &str, role: Role, credential: &str) -> Result<User> {
        if let Some(existing) = self.find(username)? {
            return Ok(existing);
        }

        let user = User::new(username, role, credential);
        self.store.append_rows(vec![user.to_row()])?;
        tracing::info!("registered new {} user {username}", role.as_str());
        Ok(user)
    }

    /// Authenticate for a session: verify, or register when the username is
    /// new. A known username with a wrong credential is refused.
    pub fn login(&mut self, username: &str, role: Role, credential: &str) -> Result<User> {
        let outcome = self.verify(username, credential)?;
        if outcome.is_new {
            return self.ensure_user(username, role, credential);
        }
        if !outcome.is_valid {
            return Err(Error::InvalidInput(format!(
                "wrong credential for {username}"
            )));
        }
        self.find(username)?
            .ok_or_else(|| Error::NotFound(username.to_string()))
    }

    /// Usernames of every coordinator, for assignment pickers
    pub fn coordinators(&self) -> Result<Vec<String>> {
        Ok(self
            .load_users()?
            .into_iter()
            .filter(|user| user.role == Role::Coordinator)
            .map(|user| user.username)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRowStore;
    use pretty_assertions::assert_eq;

    fn directory_with(users: &[User]) -> UserDirectory<InMemoryRowStore> {
        let rows = users.iter().map(User::to_row).collect();
        UserDirectory::new(InMemoryRowStore::with_rows(rows))
    }

    #[test]
    fn test_unknown_username_is_new() {
        let directory = directory_with(&[]);
        let outcome = directory.verify("ghost", "anything").unwrap();
        assert_eq!(
            outcome,
            VerifyOutcome {
                is_new: true,
                is_valid: false,
                existing_role: None,
            }
        );
    }

    #[test]
    fn test_known_username_exact_match_only() {
        let directory = directory_with(&[User::new("alice", Role::Coordinator, "pw")]);

        let good = directory.verify("alice", "pw").unwrap();
        assert!(!good.is_new);
        assert!(good.is_valid);
        assert_eq!(good.existing_role, Some(Role::Coordinator));

        let bad = directory.verify("alice", "PW").unwrap();
        assert!(!bad.is_new);
        assert!(!bad.is_valid);
    }

    #[test]
    fn test_ensure_user_appends_once() {
        let mut directory = directory_with(&[]);
        directory
            .ensure_user("alice", Role::Coordinator, "pw")
            .unwrap();
        // Re-registration with a different role keeps the original row
        let stored = directory
            .ensure_user("alice", Role::Head, "other")
            .unwrap();

        assert_eq!(stored.role, Role::Coordinator);
        assert_eq!(directory.load_users().unwrap().len(), 1);
    }

    #[test]
    fn test_login_refuses_wrong_credential() {
        let mut directory = directory_with(&[User::new("alice", Role::Coordinator, "pw")]);
        assert!(directory.login("alice", Role::Coordinator, "nope").is_err());

        let user = directory.login("alice", Role::Coordinator, "pw").unwrap();
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_login_registers_new_username() {
        let mut directory = directory_with(&[]);
        let user = directory.login("dana", Role::Head, "secret").unwrap();
        assert_eq!(user.role, Role::Head);
        assert_eq!(directory.load_users().unwrap().len(), 1);
    }

    #[test]
    fn test_coordinators_listing() {
        let directory = directory_with(&[
            User::new("alice", Role::Coordinator, "a"),
            User::new("boss", Role::Head, "b"),
            User::new("carol", Role::Coordinator, "c"),
        ]);
        assert_eq!(directory.coordinators().unwrap(), vec!["alice", "carol"]);
    }
}

//! Administrative user management and password authentication.

use std::sync::Arc;

use serde::Deserialize;
use tally_shared::types::UserId;
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::{Authenticator, User, UserRole};
use crate::ledger::store::{CashRegisterStore, NewUser, UserChanges};
use crate::ledger::{LedgerError, types::non_blank};

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    /// Login name; surrounding whitespace is trimmed.
    pub username: String,
    /// Plain-text password.
    pub password: String,
    /// Role.
    pub role: UserRole,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Input for updating a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    /// New plain-text password.
    #[serde(default)]
    pub password: Option<String>,
    /// New role.
    #[serde(default)]
    pub role: Option<UserRole>,
    /// New display name; blank clears it.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Activate or deactivate.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// User management over a store.
pub struct UserDirectory<S: CashRegisterStore> {
    store: Arc<S>,
}

impl<S: CashRegisterStore> UserDirectory<S> {
    /// Create a directory over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an active user with a hashed password.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank username or empty password
    /// - `UsernameTaken` if the username exists
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, LedgerError> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(LedgerError::InvalidInput("username must not be blank".into()));
        }
        let password_hash = hash(&input.password)?;

        let user = self
            .store
            .insert_user(NewUser {
                id: UserId::new(),
                username,
                password_hash,
                display_name: non_blank(input.display_name),
                role: input.role,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Update password, role, display name, or active flag.
    pub async fn update_user(
        &self,
        user_id: UserId,
        input: UpdateUserInput,
    ) -> Result<User, LedgerError> {
        let password_hash = input.password.as_deref().map(hash).transpose()?;
        let changes = UserChanges {
            password_hash,
            role: input.role,
            display_name: input.display_name.map(|name| non_blank(Some(name))),
            is_active: input.is_active,
        };

        let user = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;

        info!(user_id = %user.id, is_active = user.is_active, "User updated");
        Ok(user)
    }

    /// Delete a user together with all of their sessions and entries.
    ///
    /// Returns false if the user did not exist.
    pub async fn delete_user(&self, user_id: UserId) -> Result<bool, LedgerError> {
        let deleted = self.store.delete_user(user_id).await?;
        if deleted {
            info!(user_id = %user_id, "User deleted");
        }
        Ok(deleted)
    }

    /// All users ordered by username.
    pub async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        self.store.list_users().await
    }

    /// Look up one user.
    pub async fn user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }
}

impl<S: CashRegisterStore> Authenticator for UserDirectory<S> {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, LedgerError> {
        let Some(credentials) = self.store.find_credentials(username.trim()).await? else {
            return Ok(None);
        };

        let verified = match verify_password(password, &credentials.password_hash) {
            Ok(verified) => verified,
            Err(e) => {
                warn!(
                    user_id = %credentials.user.id,
                    error = %e,
                    "Stored password hash is unusable"
                );
                false
            }
        };

        if !verified || !credentials.user.is_active {
            return Ok(None);
        }
        Ok(Some(credentials.user))
    }
}

fn hash(password: &str) -> Result<String, LedgerError> {
    if password.is_empty() {
        return Err(LedgerError::InvalidInput("password must not be empty".into()));
    }
    hash_password(password).map_err(|e| LedgerError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryStore;

    fn directory() -> UserDirectory<InMemoryStore> {
        UserDirectory::new(Arc::new(InMemoryStore::new()))
    }

    fn input(username: &str, password: &str, role: UserRole) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            password: password.to_string(),
            role,
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate_active_user() {
        let dir = directory();
        let created = dir
            .create_user(input(" admin ", "admin", UserRole::Supervisor))
            .await
            .unwrap();
        assert_eq!(created.username, "admin");

        let user = dir.authenticate("admin", "admin").await.unwrap().unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(user.role, UserRole::Supervisor);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_wrong_password_and_unknown_user() {
        let dir = directory();
        dir.create_user(input("ana", "secret", UserRole::Operator)).await.unwrap();

        assert!(dir.authenticate("ana", "Secret").await.unwrap().is_none());
        assert!(dir.authenticate("bob", "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let dir = directory();
        let user = dir.create_user(input("ana", "secret", UserRole::Operator)).await.unwrap();

        dir.update_user(
            user.id,
            UpdateUserInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(dir.authenticate("ana", "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_change() {
        let dir = directory();
        let user = dir.create_user(input("ana", "old", UserRole::Operator)).await.unwrap();

        dir.update_user(
            user.id,
            UpdateUserInput {
                password: Some("new".into()),
                role: Some(UserRole::Supervisor),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(dir.authenticate("ana", "old").await.unwrap().is_none());
        let user = dir.authenticate("ana", "new").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Supervisor);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let dir = directory();
        dir.create_user(input("ana", "a", UserRole::Operator)).await.unwrap();

        let err = dir.create_user(input("ana", "b", UserRole::Supervisor)).await.unwrap_err();
        assert!(matches!(err, LedgerError::UsernameTaken(name) if name == "ana"));
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected() {
        let dir = directory();
        assert!(matches!(
            dir.create_user(input("  ", "a", UserRole::Operator)).await,
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            dir.create_user(input("ana", "", UserRole::Operator)).await,
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_display_name_set_and_cleared() {
        let dir = directory();
        let user = dir
            .create_user(CreateUserInput {
                display_name: Some("Ana M.".into()),
                ..input("ana", "a", UserRole::Operator)
            })
            .await
            .unwrap();
        assert_eq!(user.effective_display_name(), "Ana M.");

        let user = dir
            .update_user(
                user.id,
                UpdateUserInput {
                    display_name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(user.display_name, None);
        assert_eq!(user.effective_display_name(), "ana");
    }

    #[tokio::test]
    async fn test_list_sorted_and_delete() {
        let dir = directory();
        let zed = dir.create_user(input("zed", "z", UserRole::Operator)).await.unwrap();
        dir.create_user(input("amy", "a", UserRole::Operator)).await.unwrap();

        let names: Vec<_> = dir
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["amy", "zed"]);

        assert!(dir.delete_user(zed.id).await.unwrap());
        assert!(!dir.delete_user(zed.id).await.unwrap());
        assert!(matches!(dir.user(zed.id).await, Err(LedgerError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let dir = directory();
        let err = dir.update_user(UserId::new(), UpdateUserInput::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(_)));
    }
}

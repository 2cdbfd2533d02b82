//! Users, roles, and credential verification.
//!
//! This module provides:
//! - User records and role definitions
//! - Password hashing with Argon2id
//! - The `Authenticator` seam used by the transport layer to turn
//!   credentials into a user identity
//! - `UserDirectory`, the administrative service over stored users

mod directory;
mod password;

pub use directory::{CreateUserInput, UpdateUserInput, UserDirectory};
pub use password::{PasswordError, hash_password, verify_password};

use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;

use crate::ledger::LedgerError;

/// Roles a register user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Cashier working shifts on a register.
    Operator,
    /// Reviews every operator's sessions and manages users.
    Supervisor,
}

impl UserRole {
    /// Returns true if this role can see reports across all users.
    #[must_use]
    pub const fn can_view_all_reports(&self) -> bool {
        matches!(self, Self::Supervisor)
    }

    /// Returns true if this role can manage users.
    #[must_use]
    pub const fn can_manage_users(&self) -> bool {
        matches!(self, Self::Supervisor)
    }

    /// Returns the lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Supervisor => "supervisor",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operator" => Ok(Self::Operator),
            "supervisor" => Ok(Self::Supervisor),
            other => Err(LedgerError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// A register user, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Optional human-readable name.
    pub display_name: Option<String>,
    /// Role.
    pub role: UserRole,
    /// Inactive users cannot log in.
    pub is_active: bool,
}

impl User {
    /// The name shown in reports: the display name, or the username when the
    /// display name is absent or blank.
    #[must_use]
    pub fn effective_display_name(&self) -> &str {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// A stored user together with its password hash.
///
/// Only the persistence and auth layers see this type.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// The user record.
    pub user: User,
    /// Argon2id PHC string.
    pub password_hash: String,
}

/// Credential verification.
///
/// Unknown usernames, wrong passwords, and inactive users all yield `None`;
/// callers cannot tell them apart.
pub trait Authenticator: Send + Sync {
    /// Verify a username/password pair.
    fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, LedgerError>> + Send;
}

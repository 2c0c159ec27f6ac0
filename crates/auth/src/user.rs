//! User accounts, keyed by phone number.

use serde::{Deserialize, Serialize};

use keystone_core::{DomainError, DomainResult, HashedPassword, PasswordHasher};

/// A registered user as persisted in the `users` collection.
///
/// # Invariants
/// - `phone` is the record key and never changes after signup.
/// - The plaintext password is never stored, only its keyed hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub hashed_password: HashedPassword,
    pub tos_agreement: bool,
}

/// Validated signup input.
#[derive(Debug, Clone)]
pub struct Signup {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub password: String,
}

/// Fields a user may change. `None` leaves the current value in place.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.password.is_none()
    }
}

/// Outward-facing view of a user (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub tos_agreement: bool,
}

impl User {
    /// Build a new account from signup input. Terms must have been accepted.
    pub fn register(signup: Signup, hasher: &PasswordHasher) -> Self {
        Self {
            hashed_password: hasher.hash(&signup.password),
            first_name: signup.first_name,
            last_name: signup.last_name,
            phone: signup.phone,
            tos_agreement: true,
        }
    }

    /// Apply a partial update in place, rehashing the password if one is given.
    pub fn apply(&mut self, update: UserUpdate, hasher: &PasswordHasher) -> DomainResult<()> {
        if update.is_empty() {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(password) = update.password {
            self.hashed_password = hasher.hash(&password);
        }
        Ok(())
    }

    pub fn verify_password(&self, password: &str, hasher: &PasswordHasher) -> bool {
        hasher.verify(password, &self.hashed_password)
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            tos_agreement: self.tos_agreement,
        }
    }
}

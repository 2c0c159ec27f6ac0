//! Session tokens issued on login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keystone_core::TokenId;

/// Lifetime of a freshly issued (or extended) token, in milliseconds.
pub const TOKEN_TTL: i64 = 60 * 60 * 1000;

/// A bearer token granting access on behalf of one user.
///
/// `expires` is an absolute Unix timestamp in milliseconds. Expired tokens are
/// kept in storage until explicitly deleted; validity is always decided
/// against the caller-supplied clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub phone: String,
    pub expires: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("The token has already expired and cannot be extended.")]
    Expired,
}

impl Token {
    /// Issue a new token for `phone`, valid for [`TOKEN_TTL`] from `now`.
    pub fn issue(phone: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: TokenId::generate(),
            phone: phone.into(),
            expires: now.timestamp_millis() + TOKEN_TTL,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now.timestamp_millis()
    }

    /// True when the token belongs to `phone` and has not expired.
    pub fn authorizes(&self, phone: &str, now: DateTime<Utc>) -> bool {
        self.phone == phone && !self.is_expired(now)
    }

    /// Push the expiry to `now + TOKEN_TTL`.
    ///
    /// Expired tokens cannot be revived; they are left untouched.
    pub fn extend(&mut self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if self.is_expired(now) {
            return Err(TokenError::Expired);
        }
        self.expires = now.timestamp_millis() + TOKEN_TTL;
        Ok(())
    }
}

//! Keyed password hashing (HMAC-SHA256, hex encoded).
//!
//! The hash is deterministic for a given secret, so a stored hash can be
//! compared against a freshly supplied password. The secret comes from the
//! process configuration and differs per environment.

use core::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of a password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap an already-hashed value (e.g. one read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// Hashes and verifies passwords with a process-wide secret.
#[derive(Clone)]
pub struct PasswordHasher {
    keyed: HmacSha256,
}

impl PasswordHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let keyed = HmacSha256::new_from_slice(secret.as_ref())
            .expect("HMAC can accept any key length");
        Self { keyed }
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Hash `password` with the configured secret.
    pub fn hash(&self, password: &str) -> HashedPassword {
        let mut mac = self.mac();
        mac.update(password.as_bytes());
        HashedPassword(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check `password` against a stored hash in constant time.
    ///
    /// A stored value that is not valid hex never matches.
    pub fn verify(&self, password: &str, stored: &HashedPassword) -> bool {
        let Ok(expected) = hex::decode(stored.as_str()) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(password.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

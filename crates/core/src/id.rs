//! Token identifiers.

use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};

/// Length of a generated token identifier.
pub const TOKEN_ID_LEN: usize = 20;

const TOKEN_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Identifier of an authentication token (also its record key).
///
/// Generated ids are [`TOKEN_ID_LEN`] lowercase alphanumeric characters.
/// Ids supplied by clients are kept verbatim; the store decides whether they
/// are usable as keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        let id = (0..TOKEN_ID_LEN)
            .map(|_| char::from(TOKEN_ID_ALPHABET[rng.gen_range(0..TOKEN_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TokenId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TokenId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TokenId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for TokenId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

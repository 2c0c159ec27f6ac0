//! One-document-per-record JSON storage.
//!
//! Records are grouped into named collections and addressed by a key that
//! doubles as the file name (`<root>/<collection>/<key>.json` for the
//! filesystem backend).

pub mod file;
pub mod in_memory;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub use file::FileStore;
pub use in_memory::InMemoryStore;

/// Record store operation error.
///
/// These are **infrastructure errors**. Whether a missing record is a 404 or a
/// failed precondition is for the caller to decide.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record '{collection}/{key}' already exists")]
    AlreadyExists { collection: String, key: String },

    #[error("record '{collection}/{key}' not found")]
    NotFound { collection: String, key: String },

    #[error("invalid collection or key name: {0:?}")]
    InvalidKey(String),

    #[error("record '{collection}/{key}' could not be decoded: {source}")]
    Decode {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("storage I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn already_exists(collection: &str, key: &str) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(collection: &str, key: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Keyed JSON document storage.
///
/// ## Operations
///
/// - `create`: exclusive; never overwrites an existing record.
/// - `read`: returns the decoded document.
/// - `update`: full replacement of an existing record (no merge). Callers
///   read-modify-write the whole document.
/// - `delete`: removes an existing record.
///
/// ## Concurrency
///
/// No locking is performed across operations. Concurrent writers to the same
/// key race: an update may be lost, and a create may interleave with a delete.
/// Implementations only guarantee that each single operation is applied as a
/// whole from the caller's point of view.
///
/// ## Naming
///
/// Collection names and keys must be non-empty and must not contain path
/// separators, `..` or NUL; anything else is rejected with
/// [`StoreError::InvalidKey`] before touching storage.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError>;

    async fn read(&self, collection: &str, key: &str) -> Result<JsonValue, StoreError>;

    async fn update(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn create(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        (**self).create(collection, key, data).await
    }

    async fn read(&self, collection: &str, key: &str) -> Result<JsonValue, StoreError> {
        (**self).read(collection, key).await
    }

    async fn update(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        (**self).update(collection, key, data).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        (**self).delete(collection, key).await
    }
}

/// Typed helpers over the JSON interface.
impl dyn RecordStore {
    pub async fn create_as<T: Serialize>(&self, collection: &str, key: &str, record: &T) -> Result<(), StoreError> {
        let data = serde_json::to_value(record).map_err(StoreError::Encode)?;
        self.create(collection, key, &data).await
    }

    /// Read and decode a record. A document whose shape does not match `T`
    /// is reported as [`StoreError::Decode`].
    pub async fn read_as<T: DeserializeOwned>(&self, collection: &str, key: &str) -> Result<T, StoreError> {
        let data = self.read(collection, key).await?;
        serde_json::from_value(data).map_err(|source| StoreError::Decode {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        })
    }

    pub async fn update_as<T: Serialize>(&self, collection: &str, key: &str, record: &T) -> Result<(), StoreError> {
        let data = serde_json::to_value(record).map_err(StoreError::Encode)?;
        self.update(collection, key, &data).await
    }
}

/// Reject names that could escape the collection directory.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey(name.to_string()));
    }
    Ok(())
}

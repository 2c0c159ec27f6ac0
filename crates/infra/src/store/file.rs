//! Filesystem-backed record store: one JSON file per record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{RecordStore, StoreError, validate_name};

/// Stores each record at `<root>/<collection>/<key>.json`.
///
/// Collection directories are created on first write. The root itself is
/// created lazily as part of that.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf, StoreError> {
        validate_name(collection)?;
        Ok(self.root.join(collection))
    }

    fn record_path(&self, collection: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_name(key)?;
        Ok(self.collection_dir(collection)?.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn write_and_close(mut file: fs::File, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    file.write_all(bytes).await.map_err(io_error(path))?;
    // tokio hands writes to a blocking pool; flush waits for them to land.
    file.flush().await.map_err(io_error(path))?;
    Ok(())
}

/// Remove a record whose initial write failed, so the key stays free.
async fn discard_partial(path: &Path, err: StoreError) -> StoreError {
    if let Err(cleanup) = fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %cleanup, "partial record left behind");
    }
    err
}

#[async_trait::async_trait]
impl RecordStore for FileStore {
    async fn create(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        let dir = self.collection_dir(collection)?;
        let path = self.record_path(collection, key)?;
        let bytes = serde_json::to_vec(data).map_err(StoreError::Encode)?;

        fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;

        let file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::already_exists(collection, key));
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        if let Err(e) = write_and_close(file, &path, &bytes).await {
            return Err(discard_partial(&path, e).await);
        }
        tracing::debug!(collection, key, "record created");
        Ok(())
    }

    async fn read(&self, collection: &str, key: &str) -> Result<JsonValue, StoreError> {
        let path = self.record_path(collection, key)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // An unreadable record is indistinguishable from a missing one to callers.
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(collection, key, error = %e, "record unreadable");
                }
                return Err(StoreError::not_found(collection, key));
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        })
    }

    async fn update(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        let path = self.record_path(collection, key)?;
        let bytes = serde_json::to_vec(data).map_err(StoreError::Encode)?;

        let file = match OpenOptions::new().write(true).truncate(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(collection, key));
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        write_and_close(file, &path, &bytes).await?;
        tracing::debug!(collection, key, "record updated");
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(collection, key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(collection, key, "record deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(collection, key)),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`.
    ///
    /// The directory is not touched here; it is created on the first write so
    /// that a directory removed while the server runs is recreated.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() {
            return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
        }

        let key = Path::new(storage_key);
        if !key.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidKey(format!(
                "Storage key '{}' must be a relative path without '..'",
                storage_key
            )));
        }

        Ok(self.base_path.join(key))
    }

    /// Create the storage root if missing. An existing directory is fine.
    async fn ensure_base_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::Unavailable(format!(
                "Failed to create storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// Write through a temp file in the target directory, then rename over the target.
fn write_atomically(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::InvalidKey(format!("{} has no parent", path.display())))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to create temp file in {}: {}", dir.display(), e))
    })?;

    temp.write_all(data).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to write {}: {}", path.display(), e))
    })?;

    temp.as_file().sync_all().map_err(|e| {
        StorageError::WriteFailed(format!("Failed to sync {}: {}", path.display(), e))
    })?;

    temp.persist(path).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    Ok(())
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<PathBuf> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_base_dir().await?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &data))
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Write task failed: {}", e)))??;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(path)
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let key = storage_key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream read error");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }
}

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::storage::StorageError;
use crate::ports::blob::{BlobStore, ObjectHead, PresignOp, Presigned};

/// Reference `BlobStore` backed by the local filesystem, rooted at
/// `storage_root` (§6.1). Keys are relative paths (content-addressed, see
/// `StorageService`) and are never allowed to escape the root.
#[derive(Clone)]
pub struct LocalFsBlobStore {
    root: PathBuf,
}

impl LocalFsBlobStore {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self { root: storage_root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains("..") || Path::new(key).is_absolute() {
            return Err(StorageError::Permanent {
                message: format!("invalid storage key: {key}"),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalFsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| StorageError::Upstream {
                message: format!("failed to create storage directory: {e}"),
                retryable: true,
            })?;
        }
        fs::write(&path, bytes).await.map_err(|e| StorageError::Upstream {
            message: format!("failed to write blob {key}: {e}"),
            retryable: true,
        })?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { key: key.to_string() })
            }
            Err(e) => Err(StorageError::Upstream {
                message: format!("failed to read blob {key}: {e}"),
                retryable: true,
            }),
        }
    }

    /// The local backend has no real signing authority. It returns a
    /// `file://` URL carrying an expiry marker so callers exercise the same
    /// contract as the S3 implementation; nothing actually enforces the
    /// expiry for local files.
    async fn presign(&self, key: &str, op: PresignOp, ttl_secs: u64) -> Result<Presigned, StorageError> {
        let path = self.resolve(key)?;
        if matches!(op, PresignOp::Get) && !path.exists() {
            return Err(StorageError::NotFound { key: key.to_string() });
        }
        let expires_at = Utc::now() + ChronoDuration::seconds(ttl_secs as i64);
        Ok(Presigned {
            url: format!("file://{}?expires={}", path.display(), expires_at.timestamp()),
            expires_at,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("failed to delete blob {key}: {e}");
                Err(StorageError::Upstream {
                    message: format!("failed to delete blob {key}: {e}"),
                    retryable: true,
                })
            }
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(ObjectHead {
                size: meta.len() as i64,
                etag: key.to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Upstream {
                message: format!("failed to stat blob {key}: {e}"),
                retryable: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsBlobStore::new(dir.path());
        store.put("aa/bb/doc.pdf", b"hello").await.unwrap();
        assert_eq!(store.get("aa/bb/doc.pdf").await.unwrap(), b"hello");
        let head = store.head("aa/bb/doc.pdf").await.unwrap().unwrap();
        assert_eq!(head.size, 5);
    }

    #[tokio::test]
    async fn get_missing_key_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsBlobStore::new(dir.path());
        let err = store.get("missing.pdf").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsBlobStore::new(dir.path());
        let err = store.put("../escape.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::Permanent { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsBlobStore::new(dir.path());
        store.delete("never-existed.pdf").await.unwrap();
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::storage::StorageError;

/// Operation a presigned URL is issued for (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignOp {
    Get,
    Put,
}

#[derive(Debug, Clone)]
pub struct Presigned {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size: i64,
    pub etag: String,
}

/// Capability consumed by `StorageService` (§2.1, §6.1). Implementations are
/// external collaborators; the core ships a local-filesystem reference
/// implementation (`blob::local::LocalFsBlobStore`) and, behind the `s3`
/// feature, an S3-backed one (`blob::s3::S3BlobStore`).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn presign(&self, key: &str, op: PresignOp, ttl_secs: u64) -> Result<Presigned, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError>;
}

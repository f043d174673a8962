use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::errors::storage::StorageError;

/// `fetch(name) -> bytes/json` with a TTL cache (§2.2). Feeds all credentials
/// consumed by `BlobStore`/`OCREngine` implementations.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, StorageError>;
}

struct CachedSecret {
    value: String,
    fetched_at: Instant,
}

/// Wraps any `SecretsProvider` with a TTL cache, the way the teacher wraps
/// config loading with masked logging rather than re-reading the
/// environment on every call.
pub struct TtlCachedSecrets<P> {
    inner: P,
    ttl: Duration,
    cache: Arc<RwLock<HashMap<String, CachedSecret>>>,
}

impl<P: SecretsProvider> TtlCachedSecrets<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<P: SecretsProvider> SecretsProvider for TtlCachedSecrets<P> {
    async fn fetch(&self, name: &str) -> Result<String, StorageError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(name) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
        }

        let value = self.inner.fetch(name).await?;
        let mut cache = self.cache.write().await;
        cache.insert(
            name.to_string(),
            CachedSecret {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }
}

/// Reference implementation backed by process environment variables.
pub struct EnvSecretsProvider;

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn fetch(&self, name: &str) -> Result<String, StorageError> {
        std::env::var(name).map_err(|_| StorageError::Upstream {
            message: format!("secret '{name}' not set"),
            retryable: false,
        })
    }
}

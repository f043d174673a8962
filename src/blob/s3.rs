use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use aws_types::region::Region as AwsRegion;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

use crate::errors::storage::StorageError;
use crate::ports::blob::{BlobStore, ObjectHead, PresignOp, Presigned};

/// `BlobStore` backed by an S3-compatible object store (§6.1), behind the
/// `s3` feature. Supports custom endpoints so MinIO and similar services work
/// the same way production S3 does.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
}

impl S3BlobStore {
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "doccore-s3",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .region(AwsRegion::new(config.region.clone()))
            .credentials_provider(credentials)
            .behavior_version_latest();

        if let Some(endpoint) = &config.endpoint_url {
            if !endpoint.is_empty() {
                builder = builder.endpoint_url(endpoint);
                info!("using custom S3 endpoint: {}", endpoint);
            }
        }

        let client = Client::from_conf(builder.build());
        Self { client, bucket: config.bucket }
    }

    fn classify(err: impl std::fmt::Display) -> StorageError {
        StorageError::Upstream {
            message: err.to_string(),
            retryable: true,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.to_vec().into())
            .send()
            .await
            .map_err(Self::classify)?;
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let res = self.client.get_object().bucket(&self.bucket).key(key).send().await;
        match res {
            Ok(output) => {
                let body = output.body.collect().await.map_err(Self::classify)?;
                Ok(body.into_bytes().to_vec())
            }
            Err(e) => {
                let svc_err = e.as_service_error();
                if svc_err.map(|e| e.is_no_such_key()).unwrap_or(false) {
                    Err(StorageError::NotFound { key: key.to_string() })
                } else {
                    Err(Self::classify(e))
                }
            }
        }
    }

    /// Presigned URLs always come from the object store itself, mirroring how
    /// the underlying SDK issues a signed request without the core ever
    /// holding the bytes.
    async fn presign(&self, key: &str, op: PresignOp, ttl_secs: u64) -> Result<Presigned, StorageError> {
        let presign_config = PresigningConfig::builder()
            .expires_in(Duration::from_secs(ttl_secs))
            .build()
            .map_err(Self::classify)?;

        let presigned = match op {
            PresignOp::Get => self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(Self::classify)?,
            PresignOp::Put => self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(Self::classify)?,
        };

        let expires_at: DateTime<Utc> = Utc::now() + chrono::Duration::seconds(ttl_secs as i64);
        Ok(Presigned {
            url: presigned.uri().to_string(),
            expires_at,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::classify)?;
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError> {
        let res = self.client.head_object().bucket(&self.bucket).key(key).send().await;
        match res {
            Ok(output) => Ok(Some(ObjectHead {
                size: output.content_length().unwrap_or(0),
                etag: output.e_tag().unwrap_or_default().trim_matches('"').to_string(),
            })),
            Err(e) => {
                let svc_err = e.as_service_error();
                if svc_err.map(|e| e.is_not_found()).unwrap_or(false) {
                    Ok(None)
                } else {
                    Err(Self::classify(e))
                }
            }
        }
    }
}

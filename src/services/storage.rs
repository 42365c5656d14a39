//! Object storage for published card images.
//!
//! The import pipeline talks to an [`ObjectStore`]; production uses S3 (or
//! MinIO in development), local runs can use [`LocalStorage`](super::local_storage::LocalStorage).

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::config::{Config, S3Config, StorageBackend};
use crate::error::{AppError, AppResult};
use crate::models::{Card, ImageExtension, ParsedName};

use super::local_storage::LocalStorage;

/// Put/delete access to an object store, addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()>;

    /// Delete the object at `key`. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Copy the object at `from` to `to`, replacing any object at `to`.
    async fn copy(&self, from: &str, to: &str) -> AppResult<()>;
}

/// Open the backend selected by configuration.
pub async fn open_store(config: &Config) -> AppResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::S3 => Ok(Arc::new(S3Storage::new(&config.s3).await?)),
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(&config.local_storage_dir).await?)),
    }
}

/// Get the content type for an image file based on its extension.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    ImageExtension::parse(ext)
        .map(|e| e.content_type())
        .unwrap_or("application/octet-stream")
}

/// Top-level key prefix: promotional cards live apart from regular ones.
fn root_prefix(is_promotional: bool) -> &'static str {
    if is_promotional { "promo" } else { "cards" }
}

/// Key an image is published under:
/// `{promo|cards}/{group}/{collection}/{level}_{name}.{ext}`.
pub fn canonical_path(
    group_tag: &str,
    collection_key: &str,
    is_promotional: bool,
    parsed: &ParsedName,
) -> String {
    format!(
        "{}/{}/{}/{}",
        root_prefix(is_promotional),
        group_tag,
        collection_key,
        parsed.canonical_key
    )
}

/// Key a persisted card's image is expected at.
///
/// Matches [`canonical_path`] for the file the card was created from.
pub fn generate_expected_path(card: &Card, group_tag: &str, is_promotional: bool) -> String {
    format!(
        "{}/{}/{}/{}_{}.{}",
        root_prefix(is_promotional),
        group_tag,
        card.collection_key,
        card.level,
        card.name.replace(' ', "_"),
        card.extension
    )
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &S3Config) -> AppResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            config.secret_key.expose_secret(),
            None,
            None,
            "card-import",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
        };

        storage.ensure_bucket_exists().await?;

        info!("S3 storage initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if !service_error.is_not_found() {
                    return Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )));
                }

                info!("Creating S3 bucket '{}'", self.bucket);
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to create bucket: {}", e)))?;
                Ok(())
            }
        }
    }

    /// Get an object and its content type.
    async fn get(&self, key: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to get {} from S3: {}",
                    key,
                    e.into_service_error()
                ))
            })?;

        let content_type = response.content_type().map(String::from);
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok((data, content_type))
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {} to S3: {}", key, e)))?;

        debug!(key = %key, size_bytes = size, "S3 upload successful");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {} from S3: {}", key, e)))?;

        debug!(key = %key, "S3 delete successful");
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to check {} in S3: {}",
                        key, service_error
                    )))
                }
            }
        }
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        let (data, content_type) = self.get(from).await?;
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        self.put(to, data, &content_type).await
    }
}

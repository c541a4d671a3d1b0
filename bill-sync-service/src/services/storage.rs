use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use service_core::error::AppError;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Blob store for archived bill documents.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;
}

/// Filesystem-backed store for development. Content types are not kept.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), AppError> {
        let path = self.base_path.join(relative_key(key)?);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }
}

/// Keys must stay under the archive root.
fn relative_key(key: &str) -> Result<&Path, AppError> {
    let path = Path::new(key);
    let contained = !key.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !contained {
        return Err(AppError::StorageError(anyhow::anyhow!(
            "Refusing storage key outside the archive root: {}",
            key
        )));
    }
    Ok(path)
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Builds a client from the default AWS credential chain.
    pub async fn from_env(bucket: String, region: String) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .load()
            .await;
        Self::new(S3Client::new(&sdk_config), bucket)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("S3 upload failed: {}", e)))?;
        Ok(())
    }
}

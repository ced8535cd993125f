use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use tracing::info;

use bow_core::config::{AwsConfig, BackupConfig};

use crate::error::StorageError;

/// Where backups are written: a local directory or an S3 bucket.
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// `BACKUP_DISK=s3` with a bucket selects S3; anything else is local.
    pub fn from_config(config: &BackupConfig) -> Result<Self, StorageError> {
        if config.disk == "s3" {
            if !config.aws.is_configured() {
                return Err(StorageError::NotConfigured(
                    "BACKUP_DISK=s3 requires BACKUP_S3_BUCKET".into(),
                ));
            }
            Ok(StorageBackend::S3(S3Backend::new(&config.aws)?))
        } else {
            Ok(StorageBackend::Local(LocalBackend::new(&config.dir)?))
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        match self {
            StorageBackend::Local(b) => b.store.as_ref(),
            StorageBackend::S3(b) => b.store.as_ref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageBackend::S3(_))
    }

    /// Key prefix under which backups live (empty for local).
    pub fn prefix(&self) -> &str {
        match self {
            StorageBackend::Local(_) => "",
            StorageBackend::S3(b) => &b.prefix,
        }
    }

    /// Human-readable location for logs and the API.
    pub fn describe(&self) -> String {
        match self {
            StorageBackend::Local(b) => b.dir.display().to_string(),
            StorageBackend::S3(b) if b.prefix.is_empty() => format!("s3://{}", b.bucket),
            StorageBackend::S3(b) => format!("s3://{}/{}", b.bucket, b.prefix),
        }
    }
}

/// Local filesystem backend.
pub struct LocalBackend {
    pub store: Arc<dyn ObjectStore>,
    pub dir: PathBuf,
}

impl LocalBackend {
    /// Creates `dir` when missing.
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let canonical = std::fs::canonicalize(dir)?;
        let store = LocalFileSystem::new_with_prefix(&canonical)?;
        info!(dir = %canonical.display(), "backups: local backend");
        Ok(Self {
            store: Arc::new(store),
            dir: canonical,
        })
    }
}

/// S3 backend.
pub struct S3Backend {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
    pub prefix: String,
}

impl S3Backend {
    pub fn new(aws: &AwsConfig) -> Result<Self, StorageError> {
        let bucket = aws
            .s3_bucket
            .as_deref()
            .ok_or_else(|| StorageError::NotConfigured("BACKUP_S3_BUCKET not set".into()))?;

        let mut builder = AmazonS3Builder::new().with_region(&aws.region);

        if let Some(ref key) = aws.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = aws.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(ref token) = aws.session_token {
            builder = builder.with_token(token);
        }

        match aws.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => {
                // object_store requires an absolute URL
                let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    endpoint.to_string()
                } else {
                    format!("https://{endpoint}")
                };
                builder = builder
                    .with_bucket_name(bucket)
                    .with_endpoint(&endpoint_url)
                    .with_allow_http(endpoint_url.starts_with("http://"));
            }
            None => {
                builder = builder.with_url(format!("s3://{bucket}"));
            }
        }

        let store = builder.build()?;

        let prefix = aws
            .s3_prefix
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        info!(bucket = %bucket, prefix = %prefix, region = %aws.region, "backups: S3 backend");

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_backend_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/backups");
        let backend = LocalBackend::new(&dir).unwrap();
        assert!(dir.is_dir());
        let backend = StorageBackend::Local(backend);
        assert!(!backend.is_remote());
        assert_eq!(backend.prefix(), "");
    }

    #[test]
    fn s3_without_bucket_is_not_configured() {
        let aws = AwsConfig {
            region: "eu-west-2".into(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            s3_bucket: None,
            s3_prefix: None,
            endpoint_url: None,
        };
        assert!(matches!(S3Backend::new(&aws), Err(StorageError::NotConfigured(_))));
    }
}

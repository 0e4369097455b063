use async_trait::async_trait;
use core_config::{env_or_default, ConfigError, FromEnv};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::repository::BlobStore;

/// Where uploaded files live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

impl FromEnv for StorageConfig {
    /// `UPLOAD_DIR` (default `./uploads`)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            upload_dir: PathBuf::from(env_or_default("UPLOAD_DIR", "./uploads")),
        })
    }
}

/// Blob store over a local directory; locators are paths relative to it
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.upload_dir.clone())
    }

    /// Resolve `locator` under the root, refusing anything that could escape it
    fn resolve(&self, locator: &str) -> AnalysisResult<PathBuf> {
        let relative = Path::new(locator);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if locator.is_empty() || escapes {
            return Err(AnalysisError::Validation(format!(
                "invalid storage locator: {locator}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn read(&self, locator: &str) -> AnalysisResult<Vec<u8>> {
        let path = self.resolve(locator)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            AnalysisError::Storage(format!("failed to read {}: {e}", path.display()))
        })?;

        debug!(locator, bytes = bytes.len(), "Read blob");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("legal-blobs-{name}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_reads_relative_locator() {
        let root = scratch_dir("read");
        std::fs::create_dir_all(root.join("case-1")).unwrap();
        std::fs::write(root.join("case-1/lease.pdf"), b"%PDF-1.7").unwrap();

        let store = LocalBlobStore::new(&root);
        let bytes = store.read("case-1/lease.pdf").await.unwrap();

        assert_eq!(bytes, b"%PDF-1.7");
        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_missing_blob_is_storage_error() {
        let root = scratch_dir("missing");
        let store = LocalBlobStore::new(&root);

        let err = store.read("nope.pdf").await.unwrap_err();

        assert!(matches!(err, AnalysisError::Storage(_)));
        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_rejects_escaping_locators() {
        let store = LocalBlobStore::new("/srv/uploads");

        for locator in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            let err = store.read(locator).await.unwrap_err();
            assert!(matches!(err, AnalysisError::Validation(_)), "{locator}");
        }
    }

    #[test]
    fn test_storage_config_from_env() {
        temp_env::with_var("UPLOAD_DIR", Some("/data/uploads"), || {
            let config = StorageConfig::from_env().unwrap();
            assert_eq!(config.upload_dir, PathBuf::from("/data/uploads"));
        });
        temp_env::with_var_unset("UPLOAD_DIR", || {
            let config = StorageConfig::from_env().unwrap();
            assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        });
    }
}

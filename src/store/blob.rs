//! Blob storage for generated media.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ConfabConfig;
use crate::error::ConfabError;
use crate::types::AssetLocation;

/// Write-once storage for binary assets such as synthesized speech.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name` and report where an asset should say it lives.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<AssetLocation, ConfabError>;
}

/// Stores blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<data_dir>/blobs`.
    pub fn from_config(config: &ConfabConfig) -> Result<Self, ConfabError> {
        let data_dir = config.data_dir().ok_or_else(|| {
            ConfabError::Configuration("no data directory could be determined".into())
        })?;
        Ok(Self::new(data_dir.join("blobs")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<AssetLocation, ConfabError> {
        let mut components = Path::new(name).components();
        let plain = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
        if !plain {
            return Err(ConfabError::InvalidArgument(format!(
                "blob name must be a plain file name: {name:?}"
            )));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "blob written");
        Ok(AssetLocation::Filesystem)
    }
}

/// Keeps blobs in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.blobs.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<AssetLocation, ConfabError> {
        self.blobs
            .write()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(AssetLocation::Blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_store_writes_under_root() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs"));

        let location = store.put("speech.mp3", b"ID3").await.unwrap();

        assert_eq!(location, AssetLocation::Filesystem);
        let written = std::fs::read(store.path_for("speech.mp3")).unwrap();
        assert_eq!(written, b"ID3");
    }

    #[tokio::test]
    async fn file_store_rejects_nested_names() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path());
        for name in ["", "..", "../escape.mp3", "a/b.mp3"] {
            assert!(store.put(name, b"x").await.is_err(), "name {name:?}");
        }
    }

    #[tokio::test]
    async fn memory_store_keeps_bytes() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.put("a.wav", &[1, 2]).await.unwrap(), AssetLocation::Blob);
        assert_eq!(store.get("a.wav").await, Some(vec![1, 2]));
        assert_eq!(store.names().await, vec!["a.wav".to_string()]);
    }

    #[test]
    fn file_store_from_config_uses_data_dir() {
        let config = ConfabConfig::new().with_data_dir("/var/lib/confab");
        let store = FileBlobStore::from_config(&config).unwrap();
        assert_eq!(store.root(), Path::new("/var/lib/confab/blobs"));
    }
}

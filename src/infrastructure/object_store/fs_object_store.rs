//! Local directory object store.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::StoredObjectName;
use crate::domain::errors::StoreError;
use crate::domain::ports::ObjectStorePort;

use super::{object_url, parse_base_url};

/// Object store backed by a directory, served from `public_base_url`.
///
/// Writes go through a temporary file in the target directory and are
/// renamed into place, so readers never observe a partial avatar.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: Url,
}

impl FsObjectStore {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidUrl` if `public_base_url` cannot carry a path.
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            root: root.into(),
            public_base_url: parse_base_url(public_base_url)?,
        })
    }

    fn object_path(&self, name: &StoredObjectName) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name.as_str());
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::io(format!("invalid object name: {name}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn put(
        &self,
        name: &StoredObjectName,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(name)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        fs::create_dir_all(&parent)
            .await
            .map_err(|e| StoreError::io(format!("failed to create {}: {e}", parent.display())))?;

        let target = path.clone();
        let size = bytes.len();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp_file = tempfile::NamedTempFile::new_in(&parent)?;
            temp_file.write_all(&bytes)?;
            temp_file.flush()?;
            temp_file.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::io(format!("write task failed: {e}")))?
        .map_err(|e| StoreError::io(format!("failed to write {}: {e}", path.display())))?;

        debug!(name = %name, content_type, size, "Stored object on disk");
        Ok(())
    }

    async fn delete(&self, names: &[StoredObjectName]) -> Result<(), StoreError> {
        for name in names {
            let path = self.object_path(name)?;
            match fs::remove_file(&path).await {
                Ok(()) => debug!(name = %name, "Deleted object from disk"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    trace!(name = %name, "Object already absent");
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Failed to delete object");
                    return Err(StoreError::io(format!(
                        "failed to delete {}: {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    async fn exists(&self, name: &StoredObjectName) -> Result<bool, StoreError> {
        let path = self.object_path(name)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(format!("failed to stat {}: {e}", path.display())))
    }

    fn public_url(&self, name: &StoredObjectName) -> String {
        object_url(&self.public_base_url, name).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn name(raw: &str) -> StoredObjectName {
        StoredObjectName::new(raw)
    }

    #[tokio::test]
    async fn test_put_then_exists() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com/").unwrap();

        assert!(!store.exists(&name("u1.webp")).await.unwrap());
        store
            .put(&name("u1.webp"), Bytes::from_static(b"webp"), "image/webp")
            .await
            .unwrap();

        assert!(store.exists(&name("u1.webp")).await.unwrap());
        assert_eq!(std::fs::read(dir.path().join("u1.webp")).unwrap(), b"webp");
    }

    #[tokio::test]
    async fn test_put_creates_prefix_directories() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com").unwrap();

        store
            .put(&name("avatars/u1.webp"), Bytes::from_static(b"a"), "image/webp")
            .await
            .unwrap();

        assert!(dir.path().join("avatars").join("u1.webp").exists());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com").unwrap();

        store
            .put(&name("u1.webp"), Bytes::from_static(b"old"), "image/webp")
            .await
            .unwrap();
        store
            .put(&name("u1.webp"), Bytes::from_static(b"new"), "image/webp")
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("u1.webp")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_delete_ignores_missing() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com").unwrap();
        std::fs::write(dir.path().join("u1.jpg"), b"jpg").unwrap();

        store
            .delete(&[name("u1.webp"), name("u1.jpg"), name("u1.png")])
            .await
            .unwrap();

        assert!(!dir.path().join("u1.jpg").exists());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com").unwrap();

        let result = store.exists(&name("../outside.webp")).await;

        assert!(matches!(result, Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_public_url_joins_base() {
        let store = FsObjectStore::new("/tmp/avatars", "https://cdn.example.com/").unwrap();
        assert_eq!(
            store.public_url(&name("u1.webp")),
            "https://cdn.example.com/u1.webp"
        );
    }

    #[tokio::test]
    async fn test_reserved_characters_map_to_distinct_objects() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com").unwrap();

        store
            .put(&name("team#1.webp"), Bytes::from_static(b"one"), "image/webp")
            .await
            .unwrap();

        assert!(!store.exists(&name("team#2.webp")).await.unwrap());
        assert_ne!(
            store.public_url(&name("team#1.webp")),
            store.public_url(&name("team#2.webp"))
        );
        assert!(store.public_url(&name("team#1.webp")).ends_with("/team%231.webp"));
    }
}

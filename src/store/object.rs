use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("object storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable blob storage that hands back a retrievable URL
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError>;
}

/// Only plain relative segments are allowed into the store
fn validate(path: &str) -> Result<&Path, ObjectStoreError> {
    let p = Path::new(path);
    let clean = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(p)
    } else {
        Err(ObjectStoreError::InvalidPath(path.to_string()))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Writes objects under a root directory; a static file server (or CDN)
/// exposes that directory at `public_base`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, ObjectStoreError> {
        let rel = validate(path)?;
        let full = self.root.join(rel);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;

        tracing::debug!(path, "object stored");
        Ok(join_url(&self.public_base, path))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    public_base: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError> {
        validate(path)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| ObjectStoreError::Unavailable("memory object store lock poisoned".into()))?;
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(join_url(&self.public_base, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        assert!(validate("attendance/123/2025-10-28_1.jpg").is_ok());
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("/abs/path").is_err());
        assert!(validate("").is_err());
    }

    #[tokio::test]
    async fn memory_store_returns_public_url() {
        let store = MemoryObjectStore::new("https://cdn.example/photos/");
        let url = store
            .put("attendance/1/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/photos/attendance/1/a.jpg");
        assert_eq!(store.object("attendance/1/a.jpg").unwrap().bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn local_store_writes_file() {
        let root = std::env::temp_dir().join(format!("portal-objects-{}", uuid::Uuid::new_v4()));
        let store = LocalObjectStore::new(&root, "/photos");

        let url = store.put("attendance/9/x.jpg", b"jpeg".to_vec(), "image/jpeg").await.unwrap();
        assert_eq!(url, "/photos/attendance/9/x.jpg");
        let written = tokio::fs::read(root.join("attendance/9/x.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}

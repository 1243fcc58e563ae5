use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncRead;

/// Content handed back by storage. The caller drains and drops it.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid storage path '{0}'")]
    InvalidPath(String),
}

/// Blob storage addressed by container and path. A missing object is
/// `Ok(None)`, never an error.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn get_file(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Option<ContentStream>, StorageError>;
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryFileStorage {
    objects: Mutex<HashMap<(String, String), Bytes>>,
}

impl MemoryFileStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, container: &str, path: &str, content: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((container.to_string(), path.to_string()), content.into());
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn get_file(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Option<ContentStream>, StorageError> {
        let objects = self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .get(&(container.to_string(), path.to_string()))
            .cloned()
            .map(|content| Box::new(io::Cursor::new(content)) as ContentStream))
    }
}

/// Storage rooted at a local directory: `<root>/<container>/<path>`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, container: &str, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(container).join(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if container.is_empty() || path.is_empty() || escapes {
            return Err(StorageError::InvalidPath(format!("{container}/{path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn get_file(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Option<ContentStream>, StorageError> {
        let full = self.resolve(container, path)?;
        match tokio::fs::File::open(&full).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

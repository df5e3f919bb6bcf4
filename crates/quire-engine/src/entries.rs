//! Durable storage for sequenced entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use bytes::Bytes;
use quire_store::{StoreError, sync_dir};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Storage for entry payloads, keyed by index.
#[async_trait::async_trait]
pub trait EntryStore: Send + Sync {
    /// Durably store `data` at `index`, replacing anything already there.
    async fn write_entry(&self, index: u64, data: Bytes) -> Result<(), StoreError>;

    /// Read the entry at `index`. Returns `None` if absent.
    async fn read_entry(&self, index: u64) -> Result<Option<Bytes>, StoreError>;

    /// Remove the entry at `index` if present.
    ///
    /// Only used to roll back entries of a batch that failed part-way.
    async fn discard_entry(&self, index: u64) -> Result<(), StoreError>;
}

/// File-based entry store.
///
/// Each entry is stored as a file at
/// `{root}/entries/{hex[0..12]}/{hex[12..14]}/{hex}` where `hex` is the
/// 16-digit index, so a leaf directory holds at most 256 entries.
pub struct FileEntryStore {
    base_dir: PathBuf,
}

impl FileEntryStore {
    /// Create an entry store under the log root.
    ///
    /// The `entries` directory is created if it does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = root.as_ref().join("entries");
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Compute the full file path for an entry index.
    pub fn entry_path(&self, index: u64) -> PathBuf {
        let hex = format!("{index:016x}");
        self.base_dir.join(&hex[0..12]).join(&hex[12..14]).join(&hex)
    }

    /// Create a fan-out directory if needed, syncing every parent that gained
    /// a new child.
    async fn create_fanout_dir(&self, dir: &Path) -> Result<(), StoreError> {
        if tokio::fs::try_exists(dir).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir).await?;

        let mut child = dir;
        while child != self.base_dir.as_path()
            && let Some(parent) = child.parent()
        {
            sync_dir(parent).await?;
            child = parent;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntryStore for FileEntryStore {
    async fn write_entry(&self, index: u64, data: Bytes) -> Result<(), StoreError> {
        let path = self.entry_path(index);
        let parent = path.parent().unwrap_or(self.base_dir.as_path());
        self.create_fanout_dir(parent).await?;

        let tmp_path = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &path).await?;
        sync_dir(parent).await?;

        debug!(index, size = data.len(), "stored entry to file");
        Ok(())
    }

    async fn read_entry(&self, index: u64) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.entry_path(index)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn discard_entry(&self, index: u64) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.entry_path(index)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// In-memory entry store backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct MemoryEntryStore {
    entries: RwLock<HashMap<u64, Bytes>>,
}

impl MemoryEntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EntryStore for MemoryEntryStore {
    async fn write_entry(&self, index: u64, data: Bytes) -> Result<(), StoreError> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.insert(index, data);
        Ok(())
    }

    async fn read_entry(&self, index: u64) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.get(&index).cloned())
    }

    async fn discard_entry(&self, index: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.remove(&index);
        Ok(())
    }
}

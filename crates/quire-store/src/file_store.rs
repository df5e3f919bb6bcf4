//! File-based checkpoint store.
//!
//! The checkpoint lives at `{root}/checkpoint`, next to whatever else the log
//! publishes, so it can be served as a static file.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::CheckpointStore;

/// File name of the checkpoint under the log root.
pub const CHECKPOINT_FILE: &str = "checkpoint";

/// Checkpoint store backed by a single file under the log root.
///
/// Writes are atomic: data is written and synced to a temporary file in the
/// same directory, renamed over the checkpoint, and the rename is made
/// durable by syncing the root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The log root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the checkpoint file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.root.join(CHECKPOINT_FILE)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for FileStore {
    async fn read_checkpoint(&self) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.checkpoint_path()).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_checkpoint(&self, data: Bytes) -> Result<(), StoreError> {
        let path = self.checkpoint_path();
        let tmp_path = path.with_extension("tmp");

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &path).await?;
        sync_dir(&self.root).await?;

        debug!(path = %path.display(), size = data.len(), "wrote checkpoint");
        Ok(())
    }
}

/// Flush a directory's entries to disk.
///
/// A rename or a newly created child is only durable once its parent
/// directory has been synced.
pub async fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    #[cfg(unix)]
    tokio::fs::File::open(dir).await?.sync_all().await?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

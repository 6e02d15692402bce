//! Artifact storage.
//!
//! Artifacts are flat files in one output folder, addressed by file name
//! ("key"). [`FsStorage`] writes to `<key>.part` first and renames it into
//! place, so a key either holds a complete artifact or does not exist. An
//! existing key is therefore enough to treat that cursor as done.

use crate::error::ScrapeError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Suffix for in-progress writes.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Key-addressed byte storage.
pub trait Storage {
    async fn exists(&self, key: &str) -> Result<bool, ScrapeError>;
    async fn read(&self, key: &str) -> Result<Vec<u8>, ScrapeError>;
    /// Store `bytes` under `key`, replacing any previous value in one step.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ScrapeError>;
    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), ScrapeError>;
    /// All keys, sorted.
    async fn list(&self) -> Result<Vec<String>, ScrapeError>;
}

/// Files in a single directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Storage for FsStorage {
    async fn exists(&self, key: &str) -> Result<bool, ScrapeError> {
        Ok(fs::try_exists(self.path(key)).await?)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, ScrapeError> {
        Ok(fs::read(self.path(key)).await?)
    }

    #[instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ScrapeError> {
        let target = self.path(key);
        let partial = self.path(&format!("{key}{PARTIAL_SUFFIX}"));
        fs::write(&partial, bytes).await?;
        fs::rename(&partial, &target).await?;
        debug!(path = %target.display(), "Wrote artifact");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ScrapeError> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, ScrapeError> {
        let mut keys = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Remove leftovers of an interrupted run.
///
/// Deletes every key for which `is_leftover` returns true, logging each one.
/// Returns the removed keys.
#[instrument(level = "info", skip_all)]
pub async fn remove_leftovers<S: Storage>(
    storage: &S,
    is_leftover: impl Fn(&str) -> bool,
) -> Result<Vec<String>, ScrapeError> {
    let mut removed = Vec::new();
    for key in storage.list().await? {
        if is_leftover(&key) {
            info!(%key, "Removing leftover file");
            storage.remove(&key).await?;
            removed.push(key);
        }
    }
    info!(count = removed.len(), "Done cleaning up files");
    Ok(removed)
}

pub mod draft_store;
pub mod json_io;
pub mod storage;

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("draft serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String-keyed backing store for drafts. Implementations are synchronous and
/// local; nothing here coordinates between processes.
pub trait DraftStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

pub(crate) fn atomic_write_string(path: &Path, content: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.as_file().sync_all()?;

    match temp_file.persist(path) {
        Ok(_) => Ok(()),
        Err(err) => {
            if err.error.kind() == io::ErrorKind::AlreadyExists {
                std::fs::remove_file(path)?;
                err.file.persist(path).map(|_| ()).map_err(|e| e.error)
            } else {
                Err(err.error)
            }
        }
    }
}

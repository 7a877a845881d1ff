use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob id {0:?}")]
    InvalidId(String),
    #[error("blob io on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Binary image storage keyed by image id
pub trait BlobStore: Send + Sync {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), BlobError>;
    /// Display URL for a stored blob, `None` when absent.
    fn url(&self, id: &str) -> Result<Option<String>, BlobError>;
    /// Deleting a missing blob is not an error.
    fn delete(&self, id: &str) -> Result<(), BlobError>;
}

/// One file per blob under a directory
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    dir: PathBuf,
}

impl DirBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirBlobStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, BlobError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BlobError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.png", id)))
    }
}

impl BlobStore for DirBlobStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir).map_err(|source| BlobError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, bytes).map_err(|source| BlobError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(id, bytes = bytes.len(), "saved blob");
        Ok(())
    }

    fn url(&self, id: &str) -> Result<Option<String>, BlobError> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Ok(None);
        }
        let absolute = fs::canonicalize(&path).map_err(|source| BlobError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(format!("file://{}", absolute.display())))
    }

    fn delete(&self, id: &str) -> Result<(), BlobError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BlobError::Io { path, source }),
        }
    }
}

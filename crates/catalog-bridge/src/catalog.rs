use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// The single "current catalog" PDF on disk.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.dir())
    }

    pub async fn exists(&self) -> io::Result<bool> {
        tokio::fs::try_exists(&self.path).await
    }

    pub async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Atomically swaps in a new catalog: readers see the old file or the new one.
    pub async fn replace(&self, bytes: Vec<u8>) -> io::Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.replace_blocking(&bytes))
            .await
            .map_err(io::Error::other)?
    }

    fn replace_blocking(&self, bytes: &[u8]) -> io::Result<()> {
        self.ensure_dir()?;
        let mut staged = NamedTempFile::new_in(self.dir())?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

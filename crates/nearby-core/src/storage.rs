//! The storage folder that holds the parameter file, metrics CSV and log file.

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// State of the storage folder on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Missing,
    NotADirectory,
    Ready,
}

#[derive(Debug, Clone)]
pub struct StorageDir {
    root: PathBuf,
}

impl StorageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn check(&self) -> StorageState {
        if !self.root.exists() {
            StorageState::Missing
        } else if !self.root.is_dir() {
            StorageState::NotADirectory
        } else {
            StorageState::Ready
        }
    }

    /// Create the folder if missing.
    ///
    /// # Errors
    /// Returns `StorageError::NotADirectory` when a file occupies the path.
    pub fn ensure(&self) -> Result<(), StorageError> {
        match self.check() {
            StorageState::Ready => Ok(()),
            StorageState::NotADirectory => Err(StorageError::NotADirectory(self.root.clone())),
            StorageState::Missing => {
                tracing::info!("Storage folder does not exist, creating {}", self.root.display());
                std::fs::create_dir_all(&self.root)?;
                Ok(())
            }
        }
    }

    /// `<root>/<name><suffix>`
    pub fn file_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.root.join(format!("{}{}", name, suffix))
    }
}

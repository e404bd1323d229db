//! Read and write `<storage>/<name>.json`.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::storage::{StorageDir, StorageState};

const JSON_SUFFIX: &str = ".json";

#[derive(Debug, Clone)]
pub struct JsonFileManager {
    storage: StorageDir,
}

impl JsonFileManager {
    pub fn new(storage: StorageDir) -> Self {
        Self { storage }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.storage.file_path(name, JSON_SUFFIX)
    }

    /// Read the file as raw JSON. Returns `None` (and logs why) when it cannot be loaded.
    pub fn read(&self, name: &str) -> Option<serde_json::Value> {
        match self.storage.check() {
            StorageState::Missing => {
                tracing::info!("Storage folder does not exist!");
                return None;
            }
            StorageState::NotADirectory => {
                tracing::warn!("Storage folder exists but is not a directory!");
                return None;
            }
            StorageState::Ready => {}
        }

        let path = self.path_for(name);
        if !path.exists() {
            tracing::info!("JSON file does not exist: {}", path.display());
            return None;
        }
        if path.is_dir() {
            tracing::warn!("JSON file is a directory: {}", path.display());
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Null) => {
                tracing::warn!("Could not load {} as JSON!", path.display());
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Could not load {} as JSON: {}", path.display(), e);
                None
            }
        }
    }

    /// Read the file and deserialize it into `T`.
    pub fn read_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.read(name)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Stored JSON '{}' has an unexpected shape: {}", name, e);
                None
            }
        }
    }

    /// Write `value` as pretty JSON, creating the storage folder if needed.
    ///
    /// # Errors
    /// Fails when the storage folder or the target path is unusable, or on IO errors.
    pub fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, StorageError> {
        self.storage.ensure()?;

        let path = self.path_for(name);
        if path.is_dir() {
            return Err(StorageError::IsADirectory(path));
        }

        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, contents)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WidgetParams;

    fn manager(root: &std::path::Path) -> JsonFileManager {
        JsonFileManager::new(StorageDir::new(root.join("storage")))
    }

    #[test]
    fn test_read_missing_storage_folder() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(manager(tmp.path()).read("nearby").is_none());
    }

    #[test]
    fn test_read_storage_folder_is_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("storage"), "x").unwrap();

        let files = manager(tmp.path());
        assert!(files.read("nearby").is_none());
        assert!(crate::params::load_stored(&files, "nearby").is_none());
    }

    #[test]
    fn test_read_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("storage")).unwrap();
        assert!(manager(tmp.path()).read("nearby").is_none());
    }

    #[test]
    fn test_read_file_is_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("storage").join("nearby.json")).unwrap();
        assert!(manager(tmp.path()).read("nearby").is_none());
    }

    #[test]
    fn test_read_invalid_or_null_json() {
        let tmp = tempfile::tempdir().unwrap();
        let files = manager(tmp.path());
        std::fs::create_dir(tmp.path().join("storage")).unwrap();

        std::fs::write(files.path_for("bad"), "{not json").unwrap();
        assert!(files.read("bad").is_none());

        std::fs::write(files.path_for("null"), "null").unwrap();
        assert!(files.read("null").is_none());
    }

    #[test]
    fn test_write_then_read_params() {
        let tmp = tempfile::tempdir().unwrap();
        let files = manager(tmp.path());

        let params = WidgetParams {
            api_key: Some("key".into()),
            debug: true,
            ..Default::default()
        };
        let path = files.write("nearby", &params).unwrap();
        assert!(path.ends_with("storage/nearby.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"apiKey\": \"key\""));

        let loaded: WidgetParams = files.read_as("nearby").unwrap();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_write_refuses_directory_target() {
        let tmp = tempfile::tempdir().unwrap();
        let files = manager(tmp.path());
        std::fs::create_dir_all(files.path_for("nearby")).unwrap();

        let result = files.write("nearby", &serde_json::json!({}));
        assert!(matches!(result, Err(StorageError::IsADirectory(_))));
    }
}

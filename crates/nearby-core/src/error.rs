//! Error types shared by the Nearby crates.
//!
//! `AppError` is what the binary reports. Every crate converts into it, and
//! `user_message()` gives the one-line hint printed after the full error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("file: {0}")]
    Io(#[from] std::io::Error),

    /// A remote service (Wikipedia, Maps, Flickr, geocoder) answered with an error.
    #[error("{0}")]
    Service(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Io(_) => "Could not write the output file.",
            AppError::Service(_) => "A map or places service refused the request.",
            AppError::Other(_) => "Something went wrong; run with RUST_LOG=debug for details.",
        }
    }
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not connect: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "No connection. Nearby places need network access.",
            NetworkError::Timeout => "A service took too long to answer. Try again in a moment.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "A service is down right now. Try again later."
            }
            NetworkError::ServerError { status: 401 | 403, .. } => {
                "The request was rejected. Check the API key."
            }
            NetworkError::ServerError { .. } => "The request was rejected.",
            NetworkError::InvalidResponse(_) => "A service answered with data Nearby cannot read.",
        }
    }
}

/// Bad widget parameters or configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("could not parse {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Parameters must be a JSON object, e.g. {\"apiKey\": \"...\"}.",
            ConfigError::ParseError(_) => "Parameters are not valid JSON.",
        }
    }
}

/// Errors from the storage folder (parameter file, metrics CSV, log file).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage folder exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Path is a directory, please delete it: {0}")]
    IsADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::NotADirectory(_) => {
                "The storage folder path is taken by a file. Remove it and try again."
            }
            StorageError::IsADirectory(_) => {
                "A storage file path is taken by a folder. Remove it and try again."
            }
            StorageError::Io(_) => "A storage file could not be read or written.",
            StorageError::Json(_) => "A stored JSON file is malformed.",
            StorageError::Csv(_) => "The performance metrics file is malformed.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_converts() {
        let app: AppError = StorageError::NotADirectory(PathBuf::from("/tmp/storage")).into();
        assert!(matches!(app, AppError::Storage(StorageError::NotADirectory(_))));
        assert!(app.user_message().contains("taken by a file"));
    }

    #[test]
    fn test_timeout_hint() {
        let app = AppError::Network(NetworkError::Timeout);
        assert_eq!(app.to_string(), "network: request timed out");
        assert!(app.user_message().contains("too long"));
    }

    #[test]
    fn test_server_error_hint_depends_on_status() {
        let hint = |status| {
            NetworkError::ServerError {
                status,
                message: String::new(),
            }
            .user_message()
        };
        assert!(hint(503).contains("later"));
        assert!(hint(403).contains("API key"));
        assert_eq!(hint(404), "The request was rejected.");
    }

    #[test]
    fn test_display_includes_path() {
        let err = StorageError::IsADirectory(PathBuf::from("/tmp/x.csv"));
        assert!(err.to_string().contains("/tmp/x.csv"));
    }
}

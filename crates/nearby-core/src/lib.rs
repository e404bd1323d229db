pub mod config;
pub mod error;
pub mod file_logger;
pub mod json_file;
pub mod params;
pub mod perf;
pub mod storage;

pub use config::{Config, ValidationResult};
pub use error::{AppError, ConfigError, NetworkError, StorageError};
pub use file_logger::FileLogger;
pub use json_file::JsonFileManager;
pub use params::{FlickrParams, ParamSource, WidgetParams, WidgetSize};
pub use perf::PerformanceDebugger;
pub use storage::StorageDir;

use anyhow::Result;

/// Initialize tracing/logging. `RUST_LOG` overrides the `info` default.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Nearby core initialized");
    Ok(())
}

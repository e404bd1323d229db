//! Step timings and the append-only performance metrics CSV.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::storage::StorageDir;

const METRICS_SUFFIX: &str = "-performance-metrics.csv";

/// Collects elapsed milliseconds per named step, in first-recorded order.
#[derive(Debug, Default)]
pub struct PerformanceDebugger {
    metrics: Mutex<Vec<(String, u128)>>,
}

impl PerformanceDebugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await `fut` and record how long it took under `name`.
    pub async fn wrap<F, T>(&self, name: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = tokio::time::Instant::now();
        let result = fut.await;
        self.record(name, start.elapsed());
        result
    }

    /// Record a timing. Re-recording a name overwrites it in place.
    pub fn record(&self, name: &str, elapsed: Duration) {
        let millis = elapsed.as_millis();
        tracing::debug!("{} took {}ms", name, millis);

        let mut metrics = self.metrics.lock();
        match metrics.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = millis,
            None => metrics.push((name.to_string(), millis)),
        }
    }

    pub fn metrics(&self) -> Vec<(String, u128)> {
        self.metrics.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<u128> {
        self.metrics
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Append one row to `<storage>/<name>-performance-metrics.csv`.
    ///
    /// An existing file keeps its header row and only those columns are
    /// written. A new file gets the recorded step names as headers. With no
    /// metrics recorded nothing is written and the path is returned as is.
    ///
    /// # Errors
    /// Fails when the storage folder is a file, the metrics path is a
    /// directory, or the file cannot be read or written.
    pub fn append_to_file(&self, storage: &StorageDir, name: &str) -> Result<PathBuf, StorageError> {
        storage.ensure()?;

        let path = storage.file_path(name, METRICS_SUFFIX);
        if path.is_dir() {
            return Err(StorageError::IsADirectory(path));
        }

        let metrics = self.metrics();
        if metrics.is_empty() {
            tracing::debug!("No performance metrics recorded, skipping {}", path.display());
            return Ok(path);
        }

        let existing = if path.exists() {
            std::fs::read_to_string(&path)?
        } else {
            String::new()
        };
        let existing = existing.trim_end_matches(['\r', '\n']);

        let (headers, mut contents) = if existing.is_empty() {
            tracing::debug!("Metrics file doesn't exist, using available headers");
            let headers: Vec<String> = metrics.iter().map(|(n, _)| n.clone()).collect();
            let header_line = csv_line(&headers)?;
            (headers, header_line)
        } else {
            tracing::debug!("Metrics file exists, writing only to its headers");
            (read_headers(existing)?, existing.to_string())
        };

        let row: Vec<String> = headers
            .iter()
            .map(|header| {
                metrics
                    .iter()
                    .find(|(n, _)| n == header)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            })
            .collect();

        contents.push('\n');
        contents.push_str(&csv_line(&row)?);
        std::fs::write(&path, contents)?;

        Ok(path)
    }
}

fn read_headers(contents: &str) -> Result<Vec<String>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_bytes());
    let headers = reader.headers()?;
    Ok(headers.iter().map(str::to_string).collect())
}

fn csv_line(fields: &[String]) -> Result<String, StorageError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string())
}

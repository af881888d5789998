//! Result persistence
//!
//! Stores are append-only: every analyzed URL adds one record, and export
//! returns everything appended so far in insertion order.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::types::AnalysisResult;

/// Sink for analysis results
pub trait ResultStore: Send + Sync + std::fmt::Debug {
    fn append(&self, result: &AnalysisResult) -> Result<()>;

    fn export_all(&self) -> Result<Vec<AnalysisResult>>;
}

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ResultStore>> {
    Ok(match config.backend {
        StoreBackend::Memory => Arc::new(MemoryResultStore::new()),
        StoreBackend::Jsonl => Arc::new(JsonlResultStore::open(&config.path)?),
    })
}

/// Keeps results in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<AnalysisResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryResultStore {
    fn append(&self, result: &AnalysisResult) -> Result<()> {
        self.results.lock().push(result.clone());
        Ok(())
    }

    fn export_all(&self) -> Result<Vec<AnalysisResult>> {
        Ok(self.results.lock().clone())
    }
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlResultStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlResultStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open result store {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for JsonlResultStore {
    fn append(&self, result: &AnalysisResult) -> Result<()> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()?;
        Ok(())
    }

    fn export_all(&self) -> Result<Vec<AnalysisResult>> {
        // Hold the writer lock so no half-written line is read back
        let _guard = self.file.lock();

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to read result store {}", self.path.display()))?;

        let mut results = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AnalysisResult>(&line) {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!("Skipping corrupt line {} in {}: {}", number + 1, self.path.display(), e),
            }
        }
        Ok(results)
    }
}

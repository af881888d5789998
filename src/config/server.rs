//! HTTP API and result store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address for HTTP server (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Enable CORS (useful for browser-based clients)
    pub cors_enabled: bool,
    /// Maximum number of URLs accepted by one batch request
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            cors_enabled: true,
            max_batch_size: 100,
        }
    }
}

/// Where analysis results are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Jsonl,
}

/// Result store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Results file for the `jsonl` backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Jsonl,
            path: directories::ProjectDirs::from("", "", "urlmin")
                .map(|d| d.data_dir().join("results.jsonl"))
                .unwrap_or_else(|| PathBuf::from(".urlmin/results.jsonl")),
        }
    }
}

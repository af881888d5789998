//! Configuration for urlmin

mod analysis;
mod logging;
mod renderer;
mod server;

pub use analysis::{AnalysisConfig, AnalysisOptions, SearchStrategyKind, MAX_REPRESENTABLE_PARAMETERS};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use renderer::{NormalizerConfig, RendererConfig};
pub use server::{HttpConfig, StoreBackend, StoreConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all rendering requests
pub const DEFAULT_USER_AGENT: &str = "urlmin/0.1 (+parameter minimization)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discovery engine configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// HTTP renderer configuration
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Content normalizer configuration
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// HTTP API server configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Result store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.analysis.collect_errors(&mut errors);

        if self.renderer.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.renderer.max_content_size == 0 {
            errors.push("max_content_size must be positive".to_string());
        }

        if self.http.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "HTTP listen_addr '{}' is not a valid socket address",
                self.http.listen_addr
            ));
        }
        if self.http.max_batch_size == 0 {
            errors.push("max_batch_size must be positive".to_string());
        }

        if self.store.backend == StoreBackend::Jsonl && self.store.path.as_os_str().is_empty() {
            errors.push("store path must not be empty for the jsonl backend".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

//! Renderer and content normalizer configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// HTTP renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// User agent string
    pub user_agent: String,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Idle connections kept per host
    pub connections_per_host: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
            max_redirects: 10,
            max_content_size: 10 * 1024 * 1024, // 10 MB
            connections_per_host: 10,
        }
    }
}

/// Content normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Elements removed together with their subtree before text is collected
    pub strip_tags: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            strip_tags: ["script", "style", "noscript", "template", "nav", "header", "footer"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

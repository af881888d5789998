//! Page rendering
//!
//! The engine only needs a capability that turns a URL into markup plus an
//! HTTP status within a bounded time. [`HttpRenderer`] provides it with a
//! plain HTTP fetch; a headless browser can be plugged in behind the same
//! trait for JavaScript-heavy sites.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::RendererConfig;
use crate::types::FetchError;

/// A rendered page as returned by the renderer
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// HTTP status code
    pub status: u16,
    /// Rendered markup or text
    pub body: String,
    /// Value of a `Retry-After` header, when the origin sent one
    pub retry_after: Option<Duration>,
}

impl RenderedPage {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability that renders a URL
///
/// Implementations must return reasonably deterministic output for repeated
/// calls on the same content. Non-2xx responses are returned as pages, not
/// errors; the scheduler decides what they mean.
#[async_trait]
pub trait Renderer: Send + Sync + Debug {
    /// Render `url`, giving up after `timeout`.
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError>;

    /// Renderer name for logs (e.g., "http")
    fn name(&self) -> &str;
}

/// Renderer backed by a pooled reqwest client
#[derive(Debug)]
pub struct HttpRenderer {
    client: reqwest::Client,
    config: RendererConfig,
}

impl HttpRenderer {
    pub fn new(config: RendererConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.connections_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else if let Some(status) = error.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError> {
        let start = Instant::now();

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status().as_u16();

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::Transport(format!("content too large: {} bytes", len)));
            }
        }

        let body = response.text().await.map_err(|e| Self::classify(e, timeout))?;
        if body.len() > self.config.max_content_size {
            return Err(FetchError::Transport(format!("content too large: {} bytes", body.len())));
        }

        tracing::trace!("Rendered {} ({}) in {:?}", url, status, start.elapsed());

        Ok(RenderedPage {
            status,
            body,
            retry_after,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_page_success_range() {
        assert!(RenderedPage::new(200, "ok").is_success());
        assert!(RenderedPage::new(204, "").is_success());
        assert!(!RenderedPage::new(301, "").is_success());
        assert!(!RenderedPage::new(503, "").is_success());
    }

    #[test]
    fn test_http_renderer_builds_with_defaults() {
        let renderer = HttpRenderer::new(RendererConfig::default()).unwrap();
        assert_eq!(renderer.name(), "http");
        assert_eq!(renderer.config().max_redirects, 10);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let renderer = HttpRenderer::new(RendererConfig::default()).unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = renderer.render(&url, Duration::from_secs(2)).await.unwrap_err();
        assert!(err.is_transient());
    }
}

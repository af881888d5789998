use anyhow::{Context, Result};
use std::path::PathBuf;
use urlmin::config::Config;

pub async fn init_config(path: PathBuf) -> Result<()> {
    let config = Config::default();
    std::fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let config_path = path.join("urlmin.toml");

    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let analysis = &config.analysis;
    let toml_content = format!(
        r#"# urlmin Configuration

[analysis]
# Similarity a candidate page must reach to count as equivalent, in (0, 1]
similarity_threshold = {:?}
# "exhaustive" (minimal cardinality) or "greedy" (fewer fetches)
strategy = "{}"
max_concurrency = {}
# Requests per minute per domain, and back-to-back burst
max_requests_per_domain = {}
domain_burst = {}
request_timeout_ms = {}
max_request_retries = {}
retry_backoff_ms = {}
# URLs with more parameters fail with TooManyParameters (at most 63)
max_parameter_count = {}
# Overall time budget per URL, 0 disables
url_deadline_secs = {}
# Also test the URL with every parameter removed
probe_bare_url = {}

[renderer]
user_agent = "{}"
connect_timeout_secs = {}
max_redirects = {}
max_content_size = {}

[normalizer]
strip_tags = [{}]

[http]
listen_addr = "{}"
cors_enabled = {}
max_batch_size = {}

[store]
# "jsonl" or "memory"
backend = "jsonl"
path = "{}"

[logging]
# "text" or "json"
format = "text"
level = "{}"
"#,
        analysis.similarity_threshold,
        analysis.strategy,
        analysis.max_concurrency,
        analysis.max_requests_per_domain,
        analysis.domain_burst,
        analysis.request_timeout_ms,
        analysis.max_request_retries,
        analysis.retry_backoff_ms,
        analysis.max_parameter_count,
        analysis.url_deadline_secs,
        analysis.probe_bare_url,
        config.renderer.user_agent,
        config.renderer.connect_timeout_secs,
        config.renderer.max_redirects,
        config.renderer.max_content_size,
        config
            .normalizer
            .strip_tags
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", "),
        config.http.listen_addr,
        config.http.cors_enabled,
        config.http.max_batch_size,
        path.join(".urlmin").join("results.jsonl").display().to_string().replace('\\', "/"),
        config.logging.level,
    );

    std::fs::write(&config_path, toml_content)?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use urlmin::{config::Config, http::HttpServer};

use super::build_analyzer;

pub async fn serve(mut config: Config, listen: Option<String>) -> Result<()> {
    if let Some(addr) = listen {
        config.http.listen_addr = addr;
    }

    let analyzer = Arc::new(build_analyzer(&config, config.analysis.clone())?);
    info!(
        "Serving with threshold {}, {} concurrent fetches, store {:?}",
        config.analysis.similarity_threshold, config.analysis.max_concurrency, config.store.backend
    );

    let server = HttpServer::new(config.http.clone(), analyzer);
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use urlmin::{
    config::{AnalysisOptions, Config, SearchStrategyKind},
    util::{read_url_list, truncate_str},
    AnalysisResult,
};

use super::build_analyzer;

pub async fn analyze_urls(
    config: Config,
    mut urls: Vec<String>,
    file: Option<PathBuf>,
    threshold: Option<f64>,
    strategy: Option<SearchStrategyKind>,
    format: String,
) -> Result<()> {
    if let Some(file) = file {
        urls.extend(read_url_list(&file)?);
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs given. Pass URLs as arguments or use --file.");
    }

    let options = AnalysisOptions {
        similarity_threshold: threshold,
        timeout_ms: None,
        strategy,
    };
    let analysis = config
        .analysis
        .with_options(&options)
        .map_err(anyhow::Error::msg)
        .context("Invalid analysis options")?;

    let analyzer = build_analyzer(&config, analysis)?;
    info!("Analyzing {} URLs", urls.len());

    let results = analyzer.analyze_batch(&urls).await;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        "text" => print_text(&results),
        _ => anyhow::bail!("Unknown format: {}", format),
    }

    Ok(())
}

fn print_text(results: &[AnalysisResult]) {
    for result in results {
        println!("{}", result.original_url);
        if result.is_success() {
            println!("  minimal:    {}", result.minimal_url);
            println!(
                "  required:   {} of {} ({})",
                result.required_params.len(),
                result.all_params.len(),
                if result.required_params.is_empty() {
                    "none".to_string()
                } else {
                    result.required_params.join(", ")
                }
            );
            println!("  similarity: {:.4}", result.similarity_score);
        } else {
            let message = result.error_message.as_deref().unwrap_or("unknown error");
            println!("  failed:     {}", truncate_str(message, 200));
        }
        println!();
    }

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    println!("{} analyzed, {} succeeded, {} failed", results.len(), succeeded, results.len() - succeeded);
}

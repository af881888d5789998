use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use urlmin::{grouping::UrlGrouper, util::read_url_list};

pub async fn group_urls(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let urls = read_url_list(&file)?;
    info!("Grouping {} URLs from {}", urls.len(), file.display());

    let mut grouper = UrlGrouper::new();
    grouper.process_urls(&urls);

    println!("Domain summary:");
    for summary in grouper.domain_summary() {
        println!(
            "  {}: {} unique paths, {} URLs",
            summary.domain, summary.unique_paths, summary.total_urls
        );
    }
    if !grouper.errors().is_empty() {
        println!("{} URLs could not be parsed", grouper.errors().len());
    }

    if let Some(output) = output {
        grouper.save_results(&output)?;
        println!("Results saved to {}", output.display());
    }

    Ok(())
}

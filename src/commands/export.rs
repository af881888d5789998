use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use urlmin::{config::Config, store::open_store};

pub async fn export_results(config: Config, output: PathBuf, format: String) -> Result<()> {
    info!("Exporting results to: {}", output.display());

    let store = open_store(&config.store)?;
    let results = store.export_all()?;

    match format.as_str() {
        "jsonl" => {
            use std::io::Write;
            let mut file = std::fs::File::create(&output)?;

            for result in &results {
                let json = serde_json::to_string(result)?;
                writeln!(file, "{}", json)?;
            }
        }
        "json" => {
            let json = serde_json::to_string_pretty(&results)?;
            std::fs::write(&output, json)?;
        }
        _ => {
            anyhow::bail!("Unknown format: {}", format);
        }
    }

    println!("Exported {} results to {}", results.len(), output.display());

    Ok(())
}

//! urlmin: discover the minimal query parameters a URL needs
//!
//! Command-line entry point for analysis, the HTTP API and URL grouping.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;
use urlmin::config::{Config, LogFormat, SearchStrategyKind};

use commands::{analyze_urls, export_results, group_urls, init_config, serve};

#[derive(Parser)]
#[command(name = "urlmin")]
#[command(about = "Find the smallest set of query parameters that renders the same page")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "urlmin.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more URLs
    Analyze {
        /// URLs to analyze
        urls: Vec<String>,

        /// Read additional URLs from a file (one per line)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Similarity threshold override
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Search strategy (exhaustive, greedy)
        #[arg(short, long)]
        strategy: Option<SearchStrategyKind>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Group a URL list by domain and path
    Group {
        /// File with one URL per line
        file: PathBuf,

        /// Directory to write the analysis files into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export stored results
    Export {
        /// Output file
        output: PathBuf,

        /// Export format (json, jsonl)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Initialize a configuration file
    Init {
        /// Directory to write urlmin.toml into
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn init_logging(config: &Config, verbose: u8) -> Result<()> {
    let level = config.logging.level.raised_by(verbose).as_tracing();

    match config.logging.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config, cli.verbose)?;

    if cli.config.exists() {
        tracing::debug!("Loaded configuration from {}", cli.config.display());
    }

    match cli.command {
        Commands::Analyze {
            urls,
            file,
            threshold,
            strategy,
            format,
        } => analyze_urls(config, urls, file, threshold, strategy, format).await,
        Commands::Serve { listen } => serve(config, listen).await,
        Commands::Group { file, output } => group_urls(file, output).await,
        Commands::Export { output, format } => export_results(config, output, format).await,
        Commands::Init { path } => init_config(path).await,
    }
}

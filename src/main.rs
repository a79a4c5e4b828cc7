use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use yield_scout::{app, config::Config};

#[derive(Parser, Debug)]
#[command(version, about = "Rank zkSync yield opportunities by fee APR plus boost APR")]
struct Args {
    /// Path to config file (optional, defaults cover every field)
    #[arg(long)]
    config: Option<String>,

    /// Chain id to query on the aggregator (overrides config)
    #[arg(long)]
    chain_id: Option<u64>,

    /// Maximum opportunities per aggregator page (overrides config)
    #[arg(long)]
    items: Option<u32>,

    /// API key for the Koi subgraph gateway (overrides config)
    #[arg(long)]
    koi_api_key: Option<String>,

    /// Chrome/Chromium binary used for page scraping (overrides config)
    #[arg(long)]
    chrome_executable: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Render deposit links as terminal hyperlinks
    #[arg(long)]
    hyperlinks: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<Config> {
    // Priority: CLI args > Config file > Defaults
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(chain_id) = args.chain_id {
        cfg.aggregator.chain_id = chain_id;
    }
    if let Some(items) = args.items {
        cfg.aggregator.items = items;
    }
    if let Some(key) = &args.koi_api_key {
        cfg.koi.api_key = Some(key.clone());
    }
    if let Some(path) = &args.chrome_executable {
        cfg.syncswap.chrome_executable = Some(path.clone());
    }

    Ok(cfg)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = app::OutputOpts {
        json: args.json,
        hyperlinks: args.hyperlinks,
    };

    let result = match load_config(&args) {
        Ok(cfg) => app::run(cfg, output).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Runtime error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

use anyhow::Context;
use archipelago::market_data::prepare_price_matrix;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_NUM_ASSETS: usize = 10;
const DEFAULT_OUTPUT_PATH: &str = "../data/portfolio_allocation.csv";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    dotenv::dotenv().ok();

    let num_assets = match std::env::var("NUM_ASSETS") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("NUM_ASSETS must be a positive integer, got `{raw}`"))?,
        Err(_) => DEFAULT_NUM_ASSETS,
    };
    let output_path = PathBuf::from(
        std::env::var("OUTPUT_PATH").unwrap_or_else(|_| DEFAULT_OUTPUT_PATH.to_string()),
    );

    if let Some(dir) = output_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            info!(dir = %dir.display(), "Created data directory");
        }
    }

    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    let client = reqwest::Client::new();
    let mut rng = rand::thread_rng();

    let summary = prepare_price_matrix(&client, num_assets, &mut rng, &mut writer).await?;
    info!(
        path = %output_path.display(),
        trading_days = summary.trading_days,
        assets = summary.tickers.len(),
        "Price matrix written"
    );
    Ok(())
}

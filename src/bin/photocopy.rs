//! CLI for photocopy - age an image with Gemini.

use clap::Parser;
use photocopy::{EffectConfig, ImageEffectClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photocopy")]
#[command(about = "Make an image look like a very old, faded photocopy (via Gemini)")]
#[command(version)]
struct Cli {
    /// Image to transform; the result is written next to it
    input: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = EffectConfig::from_env()?;
    let client = ImageEffectClient::gemini(config)?;
    let output = client.apply_effect(&cli.input).await?;

    println!("Updated image saved as: {}", output.display());
    Ok(())
}

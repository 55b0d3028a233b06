use anyhow::Result;
use sahayi::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}

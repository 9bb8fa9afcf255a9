use anyhow::Result;
use clap::Parser;
use safesphere_cli::{logging, run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json)?;

    tracing::debug!(command = ?cli.command, "Starting SafeSphere CLI");
    run(cli).await
}

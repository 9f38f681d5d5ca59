use anyhow::Context;
use clap::Parser;
use swob_qa_processor::cli::{run, setup_logging, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_file.as_deref()).context("Failed to set up logging")?;

    run(cli).await.context("swob-qa-processor failed")?;
    Ok(())
}

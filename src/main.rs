use anyhow::{Context, Result};
use clap::Parser;
use crm_helpers::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let workspace = args.workspace_root();
    let _guard = logging::init(&args.command, Some(&workspace))
        .context("failed to initialize logging")?;
    cli::run(args).await
}

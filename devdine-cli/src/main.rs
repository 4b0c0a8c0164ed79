use anyhow::Result;
use clap::Parser;
use devdine_cli::{cli::Cli, settings::Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.clone())?;
    cli.run(settings).await?;

    Ok(())
}

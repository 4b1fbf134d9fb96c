use anyhow::Context;
use clap::Parser;
use mode_agent::{check, daemon, init_subscriber_with_config, Cli, Command};
use mode_ctrl::{FileConfigSource, FsGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber_with_config(cli.tracing_config()).context("failed to initialize logging")?;

    match cli.command() {
        Command::Run => daemon::run(&cli).await,
        Command::Check => {
            let report = check::check(&FileConfigSource::new(&cli.config), &FsGateway::new())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.controllable() == 0 && !cli.allow_empty {
                anyhow::bail!("no controllable path in {}", cli.config.display());
            }
            Ok(())
        }
    }
}

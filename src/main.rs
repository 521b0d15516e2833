mod cli;
mod daylight;
mod download;
mod error;
mod locations;
mod poll;
mod retention;
mod selector;
mod weather;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use env_logger::Env;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    match &cli.command {
        Commands::Watch {
            selection,
            download,
            extra,
        } => command::watch(selection, download, *extra).await?,
        Commands::Scan { selection } => {
            let candidates = command::scan(selection).await?;
            if candidates.is_empty() {
                println!("No locations to capture right now");
            }
            for (name, entry) in candidates {
                println!("{:<32} {:<14} {}", name, entry.weather, entry.url);
            }
        }
        Commands::Capture {
            name,
            url,
            download,
        } => {
            let folder = command::capture(name, url, download).await?;
            println!("Clip saved to `{}`", folder);
        }
    }

    Ok(())
}

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ServerArgs};
use localtasks::config::Config;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = load_config(&args)?;
            if let Err(e) = localtasks::api::run(config).await {
                tracing::error!(error = %e, "localtasks exited with an error");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_config(args: &ServerArgs) -> Result<Config, AnyError> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path.clone())?,
        None => Config::load()?,
    };

    if let Some(address) = args.address {
        config.server.bind_addr = address;
        config.validate()?;
    }

    Ok(config)
}

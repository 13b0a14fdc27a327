use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "localtasks")]
#[command(about = "Local key-value store with a file-processing job queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control surface and the queue consumer
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (must be loopback)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Configuration file (defaults to $LOCALTASKS_CONFIG or config/localtasks.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

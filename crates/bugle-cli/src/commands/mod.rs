//! CLI command definitions.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod publish;
pub mod serve;
pub mod watch;

#[derive(Parser)]
#[command(name = "bugle", version, about = "Real-time fan-out service for the bug tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the WebSocket gateway
    Serve(serve::ServeArgs),
    /// Publish a test envelope to the notifications channel
    Publish(publish::PublishArgs),
    /// Attach to an organization room and print events
    Watch(watch::WatchArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args).await,
            Commands::Publish(args) => publish::execute(args).await,
            Commands::Watch(args) => watch::execute(args).await,
        }
    }
}

//! Gateway command.

use anyhow::Result;
use bugle_core::Config;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Mirror log output to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (implies --log)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }

    println!();
    println!("  {} {}", "Bugle".cyan().bold(), "Gateway".bold());
    println!();
    println!(
        "  {}  ws://0.0.0.0:{}/ws",
        "WebSocket".green(),
        config.port
    );
    println!(
        "  {}     http://0.0.0.0:{}/health",
        "Health".green(),
        config.port
    );
    println!("  {}     {}", "Broker".green(), config.redis_url);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    bugle_gateway::run_server(config).await
}

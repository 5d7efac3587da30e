//! Attach to an organization room and print live events.

use std::sync::Arc;

use anyhow::Result;
use bugle_client::{ClientConfig, ClientEvent, RealtimeClient};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct WatchArgs {
    /// Organization room to join
    #[arg(long)]
    pub organization: String,

    /// Gateway URL
    #[arg(long, default_value = "ws://127.0.0.1:5003/ws")]
    pub url: String,

    /// Token presented on connect and re-presented on every reconnect
    #[arg(long, env = "BUGLE_TOKEN")]
    pub token: Option<String>,
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let token = args.token.clone();
    let (client, mut events) = RealtimeClient::start(
        ClientConfig::new(&args.url),
        Arc::new(move || token.clone()),
    );
    client.join(&args.organization);

    println!(
        "{} {} ({})",
        "watching".cyan().bold(),
        args.organization,
        args.url.dimmed()
    );

    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::State(state) => {
                println!("{} {:?}", "state".dimmed(), state);
            }
            ClientEvent::Event(event) => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                println!("{} {}", event.name().green().bold(), payload);
            }
        }
    }
    Ok(())
}

//! Publish a test envelope through the broker, standing in for the mutation
//! services when exercising the pipeline by hand.

use anyhow::{Context, Result};
use bugle_core::{Config, Envelope, Event};
use bugle_redis::EventPublisher;
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

#[derive(Args)]
pub struct PublishArgs {
    /// Target organization room; omit to broadcast to every connection
    #[arg(long)]
    pub organization: Option<String>,

    /// Event name
    #[arg(
        long,
        default_value = "bug-created",
        value_parser = [
            "bug-created",
            "bug-updated",
            "bug-deleted",
            "comment-added",
            "comment-deleted",
        ]
    )]
    pub event: String,

    /// JSON payload; an empty object gets a generated record
    #[arg(long, default_value = "{}")]
    pub data: String,
}

pub async fn execute(args: PublishArgs) -> Result<()> {
    let config = Config::from_env();

    let mut data: Value = serde_json::from_str(&args.data).context("payload is not valid JSON")?;
    if data.as_object().is_some_and(|obj| obj.is_empty()) {
        data = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "title": "Manually published test event",
            "createdAt": chrono::Utc::now().to_rfc3339(),
        });
    }

    let event: Event = serde_json::from_value(json!({ "event": args.event, "data": data }))
        .context("payload does not match the event's shape")?;

    let pool = bugle_redis::init_pool(&config.redis_url)
        .await
        .context("failed to connect to the broker")?;
    let publisher = EventPublisher::new(pool);
    publisher
        .publish(&Envelope {
            organization_id: args.organization.clone(),
            event,
        })
        .await;

    match &args.organization {
        Some(org) => println!("{} {} to {}", "published".green(), args.event.bold(), org),
        None => println!("{} {} as a broadcast", "published".green(), args.event.bold()),
    }
    Ok(())
}

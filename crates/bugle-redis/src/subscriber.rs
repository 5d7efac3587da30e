//! Subscribe side of the broker bridge.
//!
//! One long-lived task owns the Pub/Sub connection: connect, subscribe,
//! forward decoded envelopes, and on any failure reconnect with bounded
//! exponential backoff. The broker does not remember subscriptions across a
//! dropped connection, so the SUBSCRIBE is re-issued on every attempt.

use std::time::Duration;

use bugle_core::{Backoff, Envelope, NOTIFICATIONS_CHANNEL};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::client::{RedisError, RedisResult};

/// Timeout for the connect and subscribe round trips.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How one pass of the subscriber loop ended.
enum SubscriberExit {
    /// The connection was healthy and then dropped; retry promptly.
    Disconnected,
    /// Connect or subscribe failed; keep backing off.
    ConnectFailed(RedisError),
    /// The dispatcher dropped its receiver; stop for good.
    ReceiverClosed,
}

/// Auto-reconnecting consumer of the notifications channel.
///
/// Envelopes are forwarded on the channel in the order the broker delivered
/// them; the single dispatcher task downstream preserves that order per
/// organization.
pub struct EventSubscriber {
    client: redis::Client,
    backoff: Backoff,
}

impl EventSubscriber {
    pub fn new(redis_url: &str, backoff: Backoff) -> RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, backoff })
    }

    /// Run until the receiving side goes away.
    pub async fn run(mut self, tx: mpsc::Sender<Envelope>) {
        loop {
            match self.run_once(&tx).await {
                SubscriberExit::Disconnected => {
                    warn!("broker connection lost, reconnecting");
                }
                SubscriberExit::ConnectFailed(e) => {
                    warn!(error = %e, "broker connect failed, backing off");
                }
                SubscriberExit::ReceiverClosed => {
                    info!("dispatcher gone, stopping broker subscriber");
                    return;
                }
            }
            tokio::time::sleep(self.backoff.next_delay()).await;
        }
    }

    async fn run_once(&mut self, tx: &mpsc::Sender<Envelope>) -> SubscriberExit {
        let mut pubsub = match timeout(CONNECT_TIMEOUT, self.client.get_async_pubsub()).await {
            Ok(Ok(pubsub)) => pubsub,
            Ok(Err(e)) => return SubscriberExit::ConnectFailed(e.into()),
            Err(_) => return SubscriberExit::ConnectFailed(RedisError::Timeout(CONNECT_TIMEOUT)),
        };

        match timeout(CONNECT_TIMEOUT, pubsub.subscribe(NOTIFICATIONS_CHANNEL)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return SubscriberExit::ConnectFailed(e.into()),
            Err(_) => return SubscriberExit::ConnectFailed(RedisError::Timeout(CONNECT_TIMEOUT)),
        }

        info!(channel = NOTIFICATIONS_CHANNEL, "broker subscriber connected");
        self.backoff.reset();

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "non-text payload on notifications channel, skipping");
                    continue;
                }
            };
            match serde_json::from_str::<Envelope>(&payload) {
                Ok(envelope) => {
                    debug!(
                        event = envelope.event.name(),
                        organization = ?envelope.organization_id,
                        "received envelope"
                    );
                    if tx.send(envelope).await.is_err() {
                        return SubscriberExit::ReceiverClosed;
                    }
                }
                Err(e) => {
                    // Bad payloads are isolated; known events keep flowing.
                    warn!(error = %e, payload = %payload, "undecodable envelope, skipping");
                }
            }
        }

        SubscriberExit::Disconnected
    }
}

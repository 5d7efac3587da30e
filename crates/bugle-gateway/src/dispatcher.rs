//! Fan-out dispatcher: a single task draining decoded envelopes and
//! re-emitting each one to the connections in the matching room.

use bugle_core::Envelope;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::registry::Registry;

/// Consume envelopes until the channel closes.
///
/// Envelopes are processed strictly in arrival order by this one task, which
/// is what preserves per-organization ordering end to end. Do not fan this
/// out across tasks.
pub async fn run(registry: Registry, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        dispatch(&registry, &envelope);
    }
    debug!("envelope channel closed, dispatcher stopping");
}

/// Deliver one envelope to its room, or to every connection when it carries
/// no organization id.
///
/// A send failing for one connection (half-closed, not yet reaped) never
/// stops delivery to the rest of the room.
pub fn dispatch(registry: &Registry, envelope: &Envelope) {
    let targets = match envelope.organization_id.as_deref() {
        Some(organization_id) => registry.members_of(organization_id),
        None => registry.connections(),
    };

    // Most organizations have no connected clients most of the time.
    if targets.is_empty() {
        return;
    }

    debug!(
        event = envelope.event.name(),
        organization = ?envelope.organization_id,
        targets = targets.len(),
        "dispatching envelope"
    );

    for (connection_id, sender) in targets {
        if sender.send(envelope.event.clone()).is_err() {
            warn!(connection_id = %connection_id, "dropping event for closed connection");
        }
    }
}

//! Connection registry: which connections exist and which organization room
//! each one is in.
//!
//! Rooms are implicit: created by the first join, removed with the last
//! member. The map is guarded by one coarse lock (room and tenant counts are
//! small); the lock is never held across an await point, and no transport
//! write happens under it: senders are cloned out and used afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bugle_core::Event;
use tokio::sync::mpsc;

/// Opaque connection identifier, unique within the process lifetime.
pub type ConnectionId = String;

/// Outbound edge of one connection. Sends never block; a closed receiver
/// means the connection is half-dead and about to be reaped.
pub type OutboundSender = mpsc::UnboundedSender<Event>;

struct Member {
    room: Option<String>,
    sender: OutboundSender,
}

#[derive(Default)]
struct Inner {
    /// organization id → member connection ids.
    rooms: HashMap<String, HashSet<ConnectionId>>,
    /// connection id → membership and outbound sender.
    connections: HashMap<ConnectionId, Member>,
}

/// Concurrency-safe room membership map.
///
/// A connection is in at most one room: joining while already in a different
/// room leaves the old room first, so a client that switches organizations
/// without an explicit leave can never stay registered in both.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection. Called once at WebSocket accept.
    pub fn register(&self, connection_id: &str, sender: OutboundSender) {
        let mut guard = self.inner.lock().unwrap();
        guard
            .connections
            .insert(connection_id.to_string(), Member { room: None, sender });
    }

    /// Join an organization room.
    ///
    /// Idempotent: joining the current room again is a no-op. Joining a
    /// different room implicitly leaves the old one. Unknown connections are
    /// ignored.
    pub fn join(&self, connection_id: &str, organization_id: &str) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let Some(member) = inner.connections.get_mut(connection_id) else {
            return;
        };
        if member.room.as_deref() == Some(organization_id) {
            return;
        }
        if let Some(old) = member.room.replace(organization_id.to_string()) {
            remove_from_room(&mut inner.rooms, &old, connection_id);
        }
        inner
            .rooms
            .entry(organization_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    /// Leave a room. A no-op when the connection is not in it.
    pub fn leave(&self, connection_id: &str, organization_id: &str) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let Some(member) = inner.connections.get_mut(connection_id) else {
            return;
        };
        if member.room.as_deref() == Some(organization_id) {
            member.room = None;
            remove_from_room(&mut inner.rooms, organization_id, connection_id);
        }
    }

    /// Outbound senders of every member of a room, cloned out so the callers
    /// send without holding the lock.
    pub fn members_of(&self, organization_id: &str) -> Vec<(ConnectionId, OutboundSender)> {
        let guard = self.inner.lock().unwrap();
        let Some(members) = guard.rooms.get(organization_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| {
                guard
                    .connections
                    .get(id)
                    .map(|member| (id.clone(), member.sender.clone()))
            })
            .collect()
    }

    /// Outbound senders of every registered connection, in a room or not.
    pub fn connections(&self) -> Vec<(ConnectionId, OutboundSender)> {
        let guard = self.inner.lock().unwrap();
        guard
            .connections
            .iter()
            .map(|(id, member)| (id.clone(), member.sender.clone()))
            .collect()
    }

    /// Forget a connection entirely. Safe for unknown ids and for
    /// connections that never joined a room.
    pub fn remove_connection(&self, connection_id: &str) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if let Some(member) = inner.connections.remove(connection_id) {
            if let Some(room) = member.room {
                remove_from_room(&mut inner.rooms, &room, connection_id);
            }
        }
    }

    /// Room the connection is currently in, if any.
    pub fn room_of(&self, connection_id: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .connections
            .get(connection_id)
            .and_then(|member| member.room.clone())
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_from_room(
    rooms: &mut HashMap<String, HashSet<ConnectionId>>,
    room: &str,
    connection_id: &str,
) {
    if let Some(members) = rooms.get_mut(room) {
        members.remove(connection_id);
        if members.is_empty() {
            rooms.remove(room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(registry: &Registry, id: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(id, tx);
        rx
    }

    #[test]
    fn join_is_idempotent() {
        let registry = Registry::new();
        let _rx = register(&registry, "c1");
        registry.join("c1", "org-1");
        registry.join("c1", "org-1");
        assert_eq!(registry.members_of("org-1").len(), 1);
    }

    #[test]
    fn joining_a_second_room_leaves_the_first() {
        let registry = Registry::new();
        let _rx = register(&registry, "c1");
        registry.join("c1", "org-a");
        registry.join("c1", "org-b");
        assert!(registry.members_of("org-a").is_empty());
        assert_eq!(registry.members_of("org-b").len(), 1);
        assert_eq!(registry.room_of("c1").as_deref(), Some("org-b"));
    }

    #[test]
    fn leave_is_idempotent_and_scoped() {
        let registry = Registry::new();
        let _rx = register(&registry, "c1");
        registry.join("c1", "org-1");

        // Leaving a room the connection is not in changes nothing.
        registry.leave("c1", "org-2");
        assert_eq!(registry.members_of("org-1").len(), 1);

        registry.leave("c1", "org-1");
        registry.leave("c1", "org-1");
        assert!(registry.members_of("org-1").is_empty());
        assert_eq!(registry.room_of("c1"), None);
    }

    #[test]
    fn remove_connection_cleans_every_room() {
        let registry = Registry::new();
        let _rx = register(&registry, "c1");
        registry.join("c1", "org-1");
        registry.remove_connection("c1");
        assert!(registry.members_of("org-1").is_empty());
        assert!(registry.is_empty());

        // Safe for connections that never joined, and for unknown ids.
        let _rx2 = register(&registry, "c2");
        registry.remove_connection("c2");
        registry.remove_connection("never-seen");
        assert!(registry.is_empty());
    }

    #[test]
    fn operations_on_unknown_connections_are_no_ops() {
        let registry = Registry::new();
        registry.join("ghost", "org-1");
        registry.leave("ghost", "org-1");
        assert!(registry.members_of("org-1").is_empty());
    }

    #[test]
    fn connections_lists_members_and_idlers_alike() {
        let registry = Registry::new();
        let _r1 = register(&registry, "c1");
        let _r2 = register(&registry, "c2");
        registry.join("c1", "org-1");
        assert_eq!(registry.connections().len(), 2);
    }
}

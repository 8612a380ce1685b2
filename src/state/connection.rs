//! Connection state management.
//!
//! Tracks live websocket connections, the outbound channel to each one, and
//! the broadcast groups (one per battle) they are subscribed to.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use crate::protocol::ServerEvent;

/// Outbound half of a connection, drained by its socket writer task.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// Connection state for a single participant.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Transient connection ID
    pub id: String,

    /// Channel to the socket writer
    tx: Outbox,

    /// Number of events queued to this connection
    pub send_seq: u64,
}

impl Connection {
    /// Create a new connection.
    pub fn new(id: String, tx: Outbox) -> Self {
        Self { id, tx, send_seq: 0 }
    }

    /// Queue an event. Returns false if the socket writer is gone.
    pub fn send(&mut self, event: ServerEvent) -> bool {
        if self.tx.send(event).is_err() {
            tracing::debug!(conn = %self.id, "outbound channel closed, event dropped");
            return false;
        }
        self.send_seq += 1;
        true
    }
}

/// Connection manager - tracks all live connections and broadcast groups.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Connections by ID
    connections: HashMap<String, Connection>,

    /// Group name to subscribed connection IDs
    groups: HashMap<String, HashSet<String>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new connection.
    pub fn add(&mut self, conn: Connection) {
        self.connections.insert(conn.id.clone(), conn);
    }

    /// Check if a connection is live.
    pub fn contains(&self, conn_id: &str) -> bool {
        self.connections.contains_key(conn_id)
    }

    /// Get a connection by ID.
    pub fn get(&self, conn_id: &str) -> Option<&Connection> {
        self.connections.get(conn_id)
    }

    /// Get a mutable connection by ID.
    pub fn get_mut(&mut self, conn_id: &str) -> Option<&mut Connection> {
        self.connections.get_mut(conn_id)
    }

    /// Remove a connection and unsubscribe it from every group.
    pub fn remove(&mut self, conn_id: &str) -> Option<Connection> {
        let conn = self.connections.remove(conn_id)?;

        self.groups.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });

        Some(conn)
    }

    /// Send an event to one connection.
    pub fn send(&mut self, conn_id: &str, event: ServerEvent) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(conn) => conn.send(event),
            None => false,
        }
    }

    /// Subscribe a live connection to a group.
    pub fn join_group(&mut self, group: &str, conn_id: &str) -> bool {
        if !self.connections.contains_key(conn_id) {
            return false;
        }
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Drop a group and all its subscriptions.
    pub fn drop_group(&mut self, group: &str) -> Option<HashSet<String>> {
        self.groups.remove(group)
    }

    /// Check if a connection is subscribed to a group.
    pub fn in_group(&self, group: &str, conn_id: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.contains(conn_id))
    }

    /// Count subscribers of a group.
    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, HashSet::len)
    }

    /// Send an event to every subscriber of a group.
    /// Returns how many connections it was queued for.
    pub fn broadcast(&mut self, group: &str, event: &ServerEvent) -> usize {
        let Some(members) = self.groups.get(group) else {
            return 0;
        };

        let mut delivered = 0;
        for conn_id in members {
            if let Some(conn) = self.connections.get_mut(conn_id) {
                if conn.send(event.clone()) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Count live connections.
    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }
}

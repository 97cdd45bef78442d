//! Connection hub: the transport side of [`Broadcaster`].
//!
//! Holds every live connection's outbound channel and the fan-out set
//! of each group. The router decides who should receive what; the hub
//! only looks up channels and pushes events into them.
//!
//! Sends are fire-and-forget. A connection whose writer has gone away
//! simply misses the event; its reader cleans up on the way out.

use std::collections::HashMap;

use chat_core::{Broadcaster, OutboundEvent};
use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::debug;

use crate::types::OutboundTx;

#[derive(Debug, Default)]
pub struct ConnectionHub {
    /// Connection id -> outbound channel.
    connections: DashMap<String, OutboundTx>,

    /// Group -> member connection ids, in join order.
    groups: RwLock<HashMap<String, IndexSet<String>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        ConnectionHub::default()
    }

    pub fn register(&self, connection_id: &str, tx: OutboundTx) {
        self.connections.insert(connection_id.to_string(), tx);
    }

    /// Drop the connection's channel and any group membership it still has.
    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);

        let mut groups = self.groups.write();
        groups.retain(|_, members| {
            members.shift_remove(connection_id);
            !members.is_empty()
        });
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every registered connection id.
    pub fn connection_ids(&self) -> Vec<String> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Members of `group`, in join order.
    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.groups
            .read()
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn deliver(&self, connection_id: &str, event: OutboundEvent) {
        match self.connections.get(connection_id) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!(connection_id, "outbound channel closed, dropping event");
                }
            }
            None => debug!(connection_id, "no such connection, dropping event"),
        }
    }
}

impl Broadcaster for ConnectionHub {
    fn add_to_group(&self, connection_id: &str, group: &str) {
        self.groups
            .write()
            .entry(group.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    fn remove_from_group(&self, connection_id: &str, group: &str) {
        let mut groups = self.groups.write();
        if let Some(members) = groups.get_mut(group) {
            members.shift_remove(connection_id);
            if members.is_empty() {
                groups.remove(group);
            }
        }
    }

    fn move_to_group(&self, connection_id: &str, from: &str, to: &str) {
        let mut groups = self.groups.write();
        if let Some(members) = groups.get_mut(from) {
            members.shift_remove(connection_id);
            if members.is_empty() {
                groups.remove(from);
            }
        }
        groups
            .entry(to.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    fn send_to_others_in_group(&self, group: &str, exclude_connection_id: &str, event: OutboundEvent) {
        // Snapshot so no group lock is held while sending.
        let members = self.group_members(group);
        for member in members.iter().filter(|m| *m != exclude_connection_id) {
            self.deliver(member, event.clone());
        }
    }

    fn send_to_connection(&self, connection_id: &str, event: OutboundEvent) {
        self.deliver(connection_id, event);
    }
}

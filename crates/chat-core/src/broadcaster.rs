//! Outbound delivery capability consumed by the router.
//!
//! The router never touches sockets. It names a group, a connection or
//! the caller, and the transport behind this trait does the rest.
//! Delivery is best-effort: a send to a vanished connection is dropped.

use crate::messages::OutboundEvent;

pub trait Broadcaster: Send + Sync {
    /// Put `connection_id` into `group`'s fan-out set.
    fn add_to_group(&self, connection_id: &str, group: &str);

    /// Take `connection_id` out of `group`'s fan-out set.
    fn remove_from_group(&self, connection_id: &str, group: &str);

    /// Leave `from` and join `to`. Implementations that can should do both
    /// under one lock.
    fn move_to_group(&self, connection_id: &str, from: &str, to: &str) {
        self.remove_from_group(connection_id, from);
        self.add_to_group(connection_id, to);
    }

    /// Deliver to every member of `group` except `exclude_connection_id`.
    fn send_to_others_in_group(&self, group: &str, exclude_connection_id: &str, event: OutboundEvent);

    /// Deliver to one specific connection.
    fn send_to_connection(&self, connection_id: &str, event: OutboundEvent);

    /// Deliver back to the connection that issued the current request.
    fn send_to_caller(&self, connection_id: &str, event: OutboundEvent) {
        self.send_to_connection(connection_id, event);
    }
}

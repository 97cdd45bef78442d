//! Shared types for the chat TCP server.

use chat_core::OutboundEvent;
use tokio::sync::mpsc;

/// Outbound events from the router to a given connection.
pub type OutboundTx = mpsc::UnboundedSender<OutboundEvent>;
pub type OutboundRx = mpsc::UnboundedReceiver<OutboundEvent>;

/// Longest inbound line accepted; a longer one closes the connection.
pub const MAX_LINE_BYTES: usize = 8 * 1024;

//! Event types used by the chat core.
//!
//! These are **transport-agnostic** logical messages:
//! - [`InboundEvent`]: what a connection asks the router to do.
//! - [`OutboundEvent`]: what the router asks the broadcaster to deliver.
//!
//! Text encoders live in the `chat-protocol` crate; this module is
//! purely logical.

/// A request arriving from one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Announce or change identity. A missing group means the lobby.
    Join { name: String, group: Option<String> },

    /// Say something to everyone else in the caller's group.
    Broadcast { text: String },

    /// Say something to a single named user.
    Direct { target: String, text: String },

    /// The transport re-established a dropped link.
    Reconnect,

    /// The connection is going away.
    Disconnect,
}

/// A delivery produced by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// System text: joins, leaves, renames, greetings.
    Notification { text: String },

    /// Chat text from a named user.
    Message { from: String, text: String },

    /// A request from this connection was refused.
    Rejected { reason: String },
}

impl OutboundEvent {
    pub fn notification(text: impl Into<String>) -> Self {
        OutboundEvent::Notification { text: text.into() }
    }

    pub fn message(from: impl Into<String>, text: impl Into<String>) -> Self {
        OutboundEvent::Message {
            from: from.into(),
            text: text.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        OutboundEvent::Rejected {
            reason: reason.into(),
        }
    }

    /// Client-side event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundEvent::Notification { .. } => "notification",
            OutboundEvent::Message { .. } => "message",
            OutboundEvent::Rejected { .. } => "error",
        }
    }
}

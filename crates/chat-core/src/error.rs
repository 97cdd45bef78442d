//! Error types for the chat core.
//!
//! Every variant is scoped to the single call that produced it; none of
//! them leave the registry or other connections in a different state.

use thiserror::Error;

/// Failures reported by an [`IdentityRegistry`](crate::IdentityRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A required identity field was empty or whitespace.
    #[error("{field} cannot be empty")]
    InvalidIdentity { field: &'static str },

    /// The name is held by a different connection. Carries the holder's
    /// spelling of the name.
    #[error("The name '{name}' is already in use.")]
    NameInUse { name: String },

    /// The backing store failed (I/O, SQL, poisoned state ...).
    #[error("identity store failure: {0}")]
    Backend(String),
}

/// Failures reported by the [`ChatRouter`](crate::ChatRouter).
///
/// `Display` is the full text for logs; [`RouterError::client_reason`] is
/// what the offending client gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Name failed policy or collided with another connection's name.
    #[error("{reason}")]
    NameRejected { reason: String },

    /// The caller tried to talk before joining.
    #[error("You have not joined the conversation. Enter a name to begin chatting.")]
    NotIdentified,

    /// Direct-message target is not connected.
    #[error("Could not find user '{name}'. They may have disconnected.")]
    RecipientNotFound { name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Shown to a client whose request hit a store failure.
pub const SERVER_ERROR_REASON: &str = "Server error, please try again.";

impl RouterError {
    /// Rejection text for the client. Store failures stay opaque.
    pub fn client_reason(&self) -> String {
        match self {
            RouterError::Registry(_) => SERVER_ERROR_REASON.to_string(),
            other => other.to_string(),
        }
    }
}

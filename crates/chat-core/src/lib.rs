//! chat-core
//!
//! Pure chat presence logic:
//! - display-name validation
//! - identity records (connection ↔ name ↔ group)
//! - the identity registry contract and its in-memory backend
//! - the router that turns client events into outbound deliveries

pub mod name_validator;
pub mod identity;
pub mod error;
pub mod registry;
pub mod messages;
pub mod broadcaster;
pub mod greeting;
pub mod router;

pub use name_validator::NameValidator;
pub use identity::IdentityRecord;
pub use error::{RegistryError, RouterError};

pub use registry::{IdentityRegistry, InMemoryRegistry};

pub use messages::{InboundEvent, OutboundEvent};

pub use broadcaster::Broadcaster;
pub use router::{ChatRouter, JoinOutcome, RouterConfig};

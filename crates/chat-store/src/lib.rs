//! chat-store
//!
//! Durable backend for `chat_core::IdentityRegistry`.
//!
//! - [`settings`] : connection-string parsing
//! - [`table`]    : the SQLite-backed keyed table
//! - [`schema`]   : table migrations

pub mod error;
pub mod schema;
pub mod settings;
pub mod table;

pub use error::StoreError;
pub use settings::{PurgePolicy, TableSettings};
pub use table::TableRegistry;

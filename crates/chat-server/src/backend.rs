//! Identity backend selection.
//!
//! Chosen once at startup from configuration; the router only ever sees
//! `Arc<dyn IdentityRegistry>`.

use std::sync::Arc;

use chat_core::{IdentityRegistry, InMemoryRegistry};
use chat_store::{StoreError, TableRegistry, TableSettings};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Table(TableSettings),
}

impl StoreBackend {
    /// `instance_id` identifies this server process in the durable table.
    pub fn open(&self, instance_id: &str) -> Result<Arc<dyn IdentityRegistry>, StoreError> {
        match self {
            StoreBackend::InMemory => {
                info!("using in-memory identity registry");
                Ok(Arc::new(InMemoryRegistry::new()))
            }
            StoreBackend::Table(settings) => {
                info!(instance_id, purge = ?settings.purge, "using table identity registry");
                Ok(Arc::new(TableRegistry::open(settings, instance_id)?))
            }
        }
    }
}

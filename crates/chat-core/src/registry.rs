//! Identity registry: the authoritative connection ↔ name mapping.
//!
//! The [`IdentityRegistry`] trait is the contract every backend meets.
//! This module also provides [`InMemoryRegistry`], the default backend.
//! The durable table backend lives in the `chat-store` crate.
//!
//! Invariants, for every backend:
//! - at most one record per connection id,
//! - at most one record per case-insensitive name,
//! - `upsert` is a single logical write: readers never see a connection
//!   with zero records while it had one, nor with two.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::identity::{normalize_name, IdentityRecord};

/// Store of live identities, keyed by connection id and by name.
pub trait IdentityRegistry: Send + Sync {
    /// Pure construction of a record; never touches the store.
    fn create(
        &self,
        name: &str,
        connection_id: &str,
        group_name: &str,
    ) -> Result<IdentityRecord, RegistryError> {
        IdentityRecord::new(name, connection_id, group_name)
    }

    /// Insert `record`, replacing whatever its connection held before.
    ///
    /// Fails with [`RegistryError::NameInUse`] when another connection
    /// holds the same case-insensitive name; nothing changes in that case.
    fn upsert(&self, record: IdentityRecord) -> Result<(), RegistryError>;

    fn get_by_connection_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<IdentityRecord>, RegistryError>;

    /// Case-insensitive lookup.
    fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>, RegistryError>;

    /// Remove the entry for `record.connection_id()`. Absent is not an error.
    fn remove(&self, record: &IdentityRecord) -> Result<(), RegistryError>;

    /// Snapshot of records whose group equals `group_name` exactly,
    /// in the order they were written.
    fn group_members(&self, group_name: &str) -> Result<Vec<IdentityRecord>, RegistryError>;

    /// Number of live records.
    fn count(&self) -> Result<usize, RegistryError>;
}

/// Mutex-guarded in-memory registry.
///
/// One lock covers both indexes, so every operation sees them agree.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    inner: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    /// Connection id -> record, in write order.
    by_connection: IndexMap<String, IdentityRecord>,

    /// Normalized name -> connection id.
    by_name: HashMap<String, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }
}

impl IdentityRegistry for InMemoryRegistry {
    fn upsert(&self, record: IdentityRecord) -> Result<(), RegistryError> {
        let key = record.name_key();
        let mut entries = self.inner.lock();

        if let Some(holder) = entries.by_name.get(&key) {
            if holder != record.connection_id() {
                let name = entries
                    .by_connection
                    .get(holder)
                    .map(|existing| existing.name().to_string())
                    .unwrap_or_else(|| record.name().to_string());
                return Err(RegistryError::NameInUse { name });
            }
        }

        // Rename path: free the old name, drop the old entry.
        if let Some(previous) = entries.by_connection.shift_remove(record.connection_id()) {
            entries.by_name.remove(&previous.name_key());
        }

        entries
            .by_name
            .insert(key, record.connection_id().to_string());
        entries
            .by_connection
            .insert(record.connection_id().to_string(), record);

        Ok(())
    }

    fn get_by_connection_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<IdentityRecord>, RegistryError> {
        let entries = self.inner.lock();
        Ok(entries.by_connection.get(connection_id).cloned())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>, RegistryError> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let entries = self.inner.lock();
        let found = entries
            .by_name
            .get(&normalize_name(name))
            .and_then(|connection_id| entries.by_connection.get(connection_id))
            .cloned();
        Ok(found)
    }

    fn remove(&self, record: &IdentityRecord) -> Result<(), RegistryError> {
        let mut entries = self.inner.lock();
        if let Some(removed) = entries.by_connection.shift_remove(record.connection_id()) {
            entries.by_name.remove(&removed.name_key());
        }
        Ok(())
    }

    fn group_members(&self, group_name: &str) -> Result<Vec<IdentityRecord>, RegistryError> {
        let entries = self.inner.lock();
        Ok(entries
            .by_connection
            .values()
            .filter(|record| record.group_name() == group_name)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.inner.lock().by_connection.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, connection_id: &str, group: &str) -> IdentityRecord {
        IdentityRecord::new(name, connection_id, group).unwrap()
    }

    #[test]
    fn upsert_then_lookup_both_ways() {
        let registry = InMemoryRegistry::new();
        registry.upsert(record("Alice", "c1", "lobby")).unwrap();

        let by_conn = registry.get_by_connection_id("c1").unwrap().unwrap();
        let by_name = registry.get_by_name("alice").unwrap().unwrap();
        assert_eq!(by_conn, by_name);
        assert_eq!(by_conn.name(), "Alice");
        assert_eq!(by_conn.group_name(), "lobby");
    }

    #[test]
    fn name_collision_differing_only_by_case() {
        let registry = InMemoryRegistry::new();
        registry.upsert(record("alice", "c1", "lobby")).unwrap();

        let err = registry.upsert(record("ALICE", "c2", "lobby")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::NameInUse {
                name: "alice".to_string()
            }
        );

        // The losing connection gained nothing.
        assert!(registry.get_by_connection_id("c2").unwrap().is_none());
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn same_connection_may_change_case_of_its_name() {
        let registry = InMemoryRegistry::new();
        registry.upsert(record("alice", "c1", "lobby")).unwrap();
        registry.upsert(record("Alice", "c1", "lobby")).unwrap();

        assert_eq!(registry.get_by_name("ALICE").unwrap().unwrap().name(), "Alice");
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn rename_frees_the_old_name() {
        let registry = InMemoryRegistry::new();
        registry.upsert(record("Alice", "c1", "lobby")).unwrap();
        registry.upsert(record("Alicia", "c1", "lobby")).unwrap();

        assert!(registry.get_by_name("Alice").unwrap().is_none());
        assert_eq!(
            registry.get_by_name("Alicia").unwrap().unwrap().connection_id(),
            "c1"
        );

        // Freed name is available to someone else.
        registry.upsert(record("Alice", "c2", "lobby")).unwrap();
        assert_eq!(registry.count().unwrap(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = InMemoryRegistry::new();
        let alice = record("Alice", "c1", "lobby");
        registry.remove(&alice).unwrap();

        registry.upsert(alice.clone()).unwrap();
        registry.remove(&alice).unwrap();
        registry.remove(&alice).unwrap();

        assert!(registry.get_by_connection_id("c1").unwrap().is_none());
        assert!(registry.get_by_name("Alice").unwrap().is_none());
    }

    #[test]
    fn group_members_in_write_order() {
        let registry = InMemoryRegistry::new();
        registry.upsert(record("Alice", "c1", "lobby")).unwrap();
        registry.upsert(record("Bob", "c2", "rust")).unwrap();
        registry.upsert(record("Carl", "c3", "lobby")).unwrap();
        registry.upsert(record("Dana", "c4", "lobby")).unwrap();

        let names: Vec<_> = registry
            .group_members("lobby")
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, ["Alice", "Carl", "Dana"]);

        // Moving Alice re-queues her at the end of her new group.
        registry.upsert(record("Alice", "c1", "rust")).unwrap();
        let rust: Vec<_> = registry
            .group_members("rust")
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(rust, ["Bob", "Alice"]);
        assert_eq!(registry.group_members("lobby").unwrap().len(), 2);
    }

    #[test]
    fn blank_name_lookup_is_absent() {
        let registry = InMemoryRegistry::new();
        assert!(registry.get_by_name("  ").unwrap().is_none());
    }

    #[test]
    fn create_does_not_touch_store() {
        let registry = InMemoryRegistry::new();
        let rec = registry.create("Alice", "c1", "Lobby").unwrap();
        assert_eq!(rec.group_name(), "lobby");
        assert_eq!(registry.count().unwrap(), 0);
        assert!(matches!(
            registry.create("", "c1", "lobby"),
            Err(RegistryError::InvalidIdentity { field: "name" })
        ));
    }
}

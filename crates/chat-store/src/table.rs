//! SQLite-backed identity registry.
//!
//! Rows are keyed like a partition/row table: the lower-cased name is the
//! partition key and the connection id is the row key. The table outlives
//! the process and may be shared by several server processes on one host.
//!
//! `upsert` is a read-check-write run as one logical transaction. Inside
//! this process the connection mutex serializes it; across processes the
//! transaction is opened `IMMEDIATE`, so SQLite's write lock covers the
//! uniqueness check too. Backends without a compare-and-swap primitive
//! (plain remote key/value tables) cannot close that window: two writers
//! may both pass the check before either inserts. Here the `UNIQUE`
//! constraint on `partition_key` turns any such loser into `NameInUse`.
//!
//! Every row records the server instance that wrote it (`owner`). A
//! process that stops without releasing its connections leaves rows
//! nobody can claim again; [`PurgePolicy::Stale`] on open, or
//! [`TableRegistry::purge_owner`] for a known-dead instance, releases them.
//!
//! rusqlite is synchronous. Callers on an async runtime should run
//! registry calls on a blocking thread.

use std::time::Duration;

use chat_core::identity::normalize_name;
use chat_core::{IdentityRecord, IdentityRegistry, RegistryError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema::{migrations, TABLE_NAME};
use crate::settings::{DataSource, PurgePolicy, TableSettings};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner recorded by [`TableRegistry::open_in_memory`].
pub const LOCAL_OWNER: &str = "local";

pub struct TableRegistry {
    conn: Mutex<Connection>,
    owner: String,
}

impl TableRegistry {
    /// Open (or create) the table described by `settings`. Rows this
    /// handle writes are stamped with `owner`, which should be unique per
    /// server process.
    pub fn open(settings: &TableSettings, owner: &str) -> Result<Self, StoreError> {
        let mut conn = match &settings.data_source {
            DataSource::Memory => Connection::open_in_memory()?,
            DataSource::File(path) => {
                let conn = Connection::open(path)?;
                // WAL so readers in other processes don't block the writer.
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn
            }
        };

        let existed = table_exists(&conn)?;
        migrations().to_latest(&mut conn)?;
        if !existed {
            info!(table = TABLE_NAME, "identity table created");
        }

        if settings.purge == PurgePolicy::Stale {
            let purged = conn.execute(
                "DELETE FROM connections WHERE owner <> ?1",
                params![owner],
            )?;
            if purged > 0 {
                info!(purged, "released identities left by earlier instances");
            }
        }

        match &settings.data_source {
            DataSource::Memory => debug!(owner, "identity table opened in memory"),
            DataSource::File(path) => info!(owner, path = %path.display(), "identity table opened"),
        }

        Ok(TableRegistry {
            conn: Mutex::new(conn),
            owner: owner.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        TableRegistry::open(
            &TableSettings {
                data_source: DataSource::Memory,
                purge: PurgePolicy::Keep,
            },
            LOCAL_OWNER,
        )
    }

    /// Instance id stamped on rows written through this handle.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Delete every row written by `owner`, an instance known to be gone.
    /// Returns how many identities were released.
    pub fn purge_owner(&self, owner: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let purged = conn.execute("DELETE FROM connections WHERE owner = ?1", params![owner])?;
        info!(owner, purged, "released identities of a dead instance");
        Ok(purged)
    }
}

impl IdentityRegistry for TableRegistry {
    fn upsert(&self, record: IdentityRecord) -> Result<(), RegistryError> {
        let partition_key = record.name_key();
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(backend)?;

        let holder: Option<(String, String)> = tx
            .query_row(
                "SELECT row_key, name FROM connections WHERE partition_key = ?1",
                params![partition_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend)?;

        if let Some((holder_connection, holder_name)) = holder {
            if holder_connection != record.connection_id() {
                // Dropping `tx` rolls back.
                return Err(RegistryError::NameInUse { name: holder_name });
            }
        }

        // The name is the partition key, so a rename is delete + insert.
        tx.execute(
            "DELETE FROM connections WHERE row_key = ?1",
            params![record.connection_id()],
        )
        .map_err(backend)?;

        tx.execute(
            "INSERT INTO connections (partition_key, row_key, name, group_name, owner)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                partition_key,
                record.connection_id(),
                record.name(),
                record.group_name(),
                self.owner
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                RegistryError::NameInUse {
                    name: record.name().to_string(),
                }
            }
            other => backend(other),
        })?;

        tx.commit().map_err(backend)
    }

    fn get_by_connection_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<IdentityRecord>, RegistryError> {
        if connection_id.trim().is_empty() {
            return Ok(None);
        }

        let conn = self.conn.lock();
        conn.query_row(
            "SELECT name, row_key, group_name FROM connections WHERE row_key = ?1",
            params![connection_id],
            read_row,
        )
        .optional()
        .map_err(backend)?
        .transpose()
    }

    fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>, RegistryError> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let conn = self.conn.lock();
        conn.query_row(
            "SELECT name, row_key, group_name FROM connections WHERE partition_key = ?1",
            params![normalize_name(name)],
            read_row,
        )
        .optional()
        .map_err(backend)?
        .transpose()
    }

    fn remove(&self, record: &IdentityRecord) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM connections WHERE row_key = ?1",
            params![record.connection_id()],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn group_members(&self, group_name: &str) -> Result<Vec<IdentityRecord>, RegistryError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT name, row_key, group_name FROM connections
                 WHERE group_name = ?1 ORDER BY seq",
            )
            .map_err(backend)?;

        let rows = stmt
            .query_map(params![group_name], read_row)
            .map_err(backend)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row.map_err(backend)??);
        }
        Ok(members)
    }

    fn count(&self) -> Result<usize, RegistryError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM connections", [], |row| row.get(0))
            .map_err(backend)?;
        Ok(count as usize)
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// Row -> record. Stored rows are re-validated; a blank field in the table
/// surfaces as `InvalidIdentity` instead of a half-built record.
fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<IdentityRecord, RegistryError>> {
    let name: String = row.get(0)?;
    let connection_id: String = row.get(1)?;
    let group_name: String = row.get(2)?;
    Ok(IdentityRecord::new(name, connection_id, group_name))
}

fn table_exists(conn: &Connection) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![TABLE_NAME],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn backend(err: rusqlite::Error) -> RegistryError {
    RegistryError::Backend(err.to_string())
}

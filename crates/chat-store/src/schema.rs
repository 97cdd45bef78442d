//! Schema for the `connections` table.
//!
//! Mirrors a partition/row keyed table:
//! - `partition_key`: lower-cased display name (one holder per name),
//! - `row_key`: connection id (one record per connection),
//! - `seq`: write order, used to list group members stably,
//! - `owner`: id of the server instance that wrote the row.

use rusqlite_migration::{Migrations, M};

pub const TABLE_NAME: &str = "connections";

/// Uses SQLite's `user_version` pragma for tracking.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: connection identities

CREATE TABLE connections (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    partition_key TEXT NOT NULL UNIQUE,
    row_key TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    group_name TEXT NOT NULL
);

CREATE INDEX idx_connections_group ON connections(group_name);
",
        ),
        // Rows written before owners existed get '' and count as stale.
        M::up(
            "-- Migration 2: owning server instance

ALTER TABLE connections ADD COLUMN owner TEXT NOT NULL DEFAULT '';

CREATE INDEX idx_connections_owner ON connections(owner);
",
        ),
    ])
}

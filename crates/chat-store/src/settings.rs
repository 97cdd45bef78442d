//! Connection-string parsing for the table store.
//!
//! Format: semicolon-separated `Key=Value` pairs, keys case-insensitive,
//! empty segments ignored.
//!
//! - `DataSource` (required): database file path, or `:memory:`.
//! - `Purge` (optional): `keep` (default) or `stale`. With `stale`, rows
//!   written by any other server instance are deleted on open. Only safe
//!   when this instance is the sole writer of the file.
//!
//! Example: `DataSource=/var/lib/chat/connections.db;Purge=stale`

use std::path::PathBuf;

use crate::error::StoreError;

/// Where the table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Private, process-local database. Mostly for tests.
    Memory,
    File(PathBuf),
}

/// What to do on open with rows owned by other instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PurgePolicy {
    /// Leave them; another live process may own them.
    #[default]
    Keep,
    /// Treat every other owner as dead and release its names.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub data_source: DataSource,
    pub purge: PurgePolicy,
}

impl TableSettings {
    pub fn parse(connection_string: &str) -> Result<Self, StoreError> {
        let mut data_source = None;
        let mut purge = PurgePolicy::default();

        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').ok_or_else(|| {
                StoreError::InvalidConnectionString(format!("expected Key=Value, got '{}'", segment))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "datasource" | "data source" => {
                    if value.is_empty() {
                        return Err(StoreError::InvalidConnectionString(
                            "DataSource is empty".to_string(),
                        ));
                    }
                    data_source = Some(if value == ":memory:" {
                        DataSource::Memory
                    } else {
                        DataSource::File(PathBuf::from(value))
                    });
                }
                "purge" => {
                    purge = match value.to_ascii_lowercase().as_str() {
                        "keep" => PurgePolicy::Keep,
                        "stale" => PurgePolicy::Stale,
                        _ => {
                            return Err(StoreError::InvalidConnectionString(format!(
                                "Purge must be 'keep' or 'stale', got '{}'",
                                value
                            )))
                        }
                    };
                }
                other => {
                    return Err(StoreError::InvalidConnectionString(format!(
                        "unknown key '{}'",
                        other
                    )))
                }
            }
        }

        let data_source = data_source.ok_or_else(|| {
            StoreError::InvalidConnectionString("missing DataSource".to_string())
        })?;

        Ok(TableSettings { data_source, purge })
    }
}

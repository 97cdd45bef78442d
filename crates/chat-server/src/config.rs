//! Configuration for the chat TCP server.
//!
//! Defaults, overridable via environment variables:
//!
//! - `CHAT_BIND_ADDR`               (default: "0.0.0.0")
//! - `CHAT_PORT`                    (default: "9000")
//! - `CHAT_MAX_CLIENTS`             (default: "1024")
//! - `CHAT_MAX_NAME_CHARS`          (default: "20")
//! - `CHAT_MAX_MESSAGE_CHARS`       (default: "500")
//! - `CHAT_DEFAULT_GROUP`           (default: "Lobby")
//! - `CHAT_STORE_CONNECTION_STRING` (default: unset → in-memory registry)

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context};
use chat_core::router::{DEFAULT_GROUP, DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_MAX_NAME_CHARS};
use chat_core::RouterConfig;
use chat_store::{StoreError, TableSettings};

use crate::backend::StoreBackend;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    pub max_name_chars: usize,

    pub max_message_chars: usize,

    /// Group for joins that name none.
    pub default_group: String,

    /// Table store to use. `None` keeps identities in memory.
    pub store_connection_string: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: 1024,
            max_name_chars: DEFAULT_MAX_NAME_CHARS,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            default_group: DEFAULT_GROUP.to_string(),
            store_connection_string: None,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let bind_addr = lookup("CHAT_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_or_default(&lookup, "CHAT_PORT", defaults.port)?;
        let max_clients = read_or_default(&lookup, "CHAT_MAX_CLIENTS", defaults.max_clients)?;
        let max_name_chars =
            read_or_default(&lookup, "CHAT_MAX_NAME_CHARS", defaults.max_name_chars)?;
        let max_message_chars =
            read_or_default(&lookup, "CHAT_MAX_MESSAGE_CHARS", defaults.max_message_chars)?;

        if max_name_chars == 0 || max_message_chars == 0 {
            bail!("CHAT_MAX_NAME_CHARS and CHAT_MAX_MESSAGE_CHARS must be positive");
        }

        let default_group = lookup("CHAT_DEFAULT_GROUP")
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(defaults.default_group);

        let store_connection_string =
            lookup("CHAT_STORE_CONNECTION_STRING").filter(|s| !s.trim().is_empty());

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            max_name_chars,
            max_message_chars,
            default_group,
            store_connection_string,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            max_name_chars: self.max_name_chars,
            max_message_chars: self.max_message_chars,
            default_group: self.default_group.clone(),
        }
    }

    /// Which identity backend this configuration selects.
    pub fn store_backend(&self) -> Result<StoreBackend, StoreError> {
        match &self.store_connection_string {
            None => Ok(StoreBackend::InMemory),
            Some(cs) => Ok(StoreBackend::Table(TableSettings::parse(cs)?)),
        }
    }
}

fn read_or_default<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: '{}'", key, val)),
        None => Ok(default),
    }
}

//! Per-connection chat protocol.
//!
//! The router owns no state. Every decision reads or writes the
//! [`IdentityRegistry`], and every delivery goes through the
//! [`Broadcaster`]. A connection is either anonymous (no record) or
//! identified (one record); `join` moves it to identified, `disconnect`
//! back out.
//!
//! Delivery policy:
//! - join / rename / leave notices: others in the affected group.
//! - greeting, reconnect notice: caller only.
//! - broadcast text: others in the sender's group, never echoed.
//! - direct text: the named recipient only.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broadcaster::Broadcaster;
use crate::error::{RegistryError, RouterError};
use crate::greeting::greeting;
use crate::identity::IdentityRecord;
use crate::messages::{InboundEvent, OutboundEvent};
use crate::name_validator::NameValidator;
use crate::registry::IdentityRegistry;

pub const DEFAULT_MAX_NAME_CHARS: usize = 20;
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;
pub const DEFAULT_GROUP: &str = "Lobby";

/// Limits and defaults applied to client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Names are cut to this many characters before trimming.
    pub max_name_chars: usize,

    /// Message text is cut to this many characters before trimming.
    pub max_message_chars: usize,

    /// Group used when a join names none. Lower-cased on use.
    pub default_group: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            max_name_chars: DEFAULT_MAX_NAME_CHARS,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// What a successful `join` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Blank name; nothing happened.
    Ignored,

    /// The connection was anonymous and now has this identity.
    Joined(IdentityRecord),

    /// The connection changed name and/or group.
    Updated {
        previous: IdentityRecord,
        current: IdentityRecord,
    },
}

pub struct ChatRouter {
    registry: Arc<dyn IdentityRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    validator: NameValidator,
    config: RouterConfig,
}

impl ChatRouter {
    pub fn new(registry: Arc<dyn IdentityRegistry>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        ChatRouter::with_config(registry, broadcaster, RouterConfig::default())
    }

    pub fn with_config(
        registry: Arc<dyn IdentityRegistry>,
        broadcaster: Arc<dyn Broadcaster>,
        config: RouterConfig,
    ) -> Self {
        ChatRouter {
            registry,
            broadcaster,
            validator: NameValidator::new(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn IdentityRegistry> {
        &self.registry
    }

    /// Dispatch one inbound event for `connection_id`.
    pub fn process_event(&self, connection_id: &str, event: InboundEvent) -> Result<(), RouterError> {
        match event {
            InboundEvent::Join { name, group } => {
                self.join(connection_id, &name, group.as_deref()).map(|_| ())
            }
            InboundEvent::Broadcast { text } => self.broadcast(connection_id, &text),
            InboundEvent::Direct { target, text } => {
                self.direct_message(connection_id, &target, &text)
            }
            InboundEvent::Reconnect => {
                self.reconnect(connection_id);
                Ok(())
            }
            InboundEvent::Disconnect => self.disconnect(connection_id).map(|_| ()),
        }
    }

    /// A transport connection opened. Nothing is bound yet.
    pub fn connect(&self, connection_id: &str) {
        info!(connection_id, "connected");
    }

    /// Announce or change the connection's identity.
    pub fn join(
        &self,
        connection_id: &str,
        name: &str,
        group: Option<&str>,
    ) -> Result<JoinOutcome, RouterError> {
        if name.trim().is_empty() {
            debug!(connection_id, "ignoring join with blank name");
            return Ok(JoinOutcome::Ignored);
        }

        let group = match group.map(str::trim) {
            Some(g) if !g.is_empty() => g.to_lowercase(),
            _ => self.config.default_group.to_lowercase(),
        };

        let name = truncate_and_trim(name, self.config.max_name_chars);
        if !self.validator.is_valid(&name) {
            info!(connection_id, name = %name, "name not allowed");
            return Err(RouterError::NameRejected {
                reason: "That name is not allowed.".to_string(),
            });
        }

        // Read before the upsert overwrites it.
        let previous = self.registry.get_by_connection_id(connection_id)?;
        let current = self.registry.create(&name, connection_id, &group)?;

        match self.registry.upsert(current.clone()) {
            Ok(()) => {}
            Err(err @ RegistryError::NameInUse { .. }) => {
                info!(connection_id, name = %name, "name already in use");
                return Err(RouterError::NameRejected {
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }

        let Some(previous) = previous else {
            self.welcome(&current)?;
            info!(connection_id, name = %name, group = %group, "joined");
            return Ok(JoinOutcome::Joined(current));
        };

        if previous.group_name() != current.group_name() {
            self.broadcaster
                .move_to_group(connection_id, previous.group_name(), current.group_name());
            info!(
                connection_id,
                from = previous.group_name(),
                to = current.group_name(),
                "changed group"
            );
        }

        if previous.name() != current.name() {
            self.broadcaster.send_to_others_in_group(
                current.group_name(),
                connection_id,
                OutboundEvent::notification(format!(
                    "{} changed their name to {}",
                    previous.name(),
                    current.name()
                )),
            );
            info!(connection_id, from = previous.name(), to = current.name(), "renamed");
        }

        Ok(JoinOutcome::Updated { previous, current })
    }

    /// Send `text` to everyone else in the caller's group.
    pub fn broadcast(&self, connection_id: &str, text: &str) -> Result<(), RouterError> {
        let sender = self.identified(connection_id)?;

        let text = truncate_and_trim(text, self.config.max_message_chars);
        if text.is_empty() {
            return Ok(());
        }

        self.broadcaster.send_to_others_in_group(
            sender.group_name(),
            connection_id,
            OutboundEvent::message(sender.name(), text),
        );
        debug!(from = sender.name(), group = sender.group_name(), "sent a message");

        Ok(())
    }

    /// Send `text` to the user currently called `target_name`.
    pub fn direct_message(
        &self,
        connection_id: &str,
        target_name: &str,
        text: &str,
    ) -> Result<(), RouterError> {
        let sender = self.identified(connection_id)?;

        let target_name = target_name.trim();
        let recipient = self
            .registry
            .get_by_name(target_name)?
            .ok_or_else(|| RouterError::RecipientNotFound {
                name: target_name.to_string(),
            })?;

        let text = truncate_and_trim(text, self.config.max_message_chars);
        if text.is_empty() {
            return Ok(());
        }

        self.broadcaster.send_to_connection(
            recipient.connection_id(),
            OutboundEvent::message(sender.name(), text),
        );
        debug!(from = sender.name(), to = recipient.name(), "sent a direct message");

        Ok(())
    }

    /// The connection is gone. Returns the identity it held, if any.
    pub fn disconnect(&self, connection_id: &str) -> Result<Option<IdentityRecord>, RouterError> {
        let Some(record) = self.registry.get_by_connection_id(connection_id)? else {
            info!(connection_id, "disconnected");
            return Ok(None);
        };

        self.registry.remove(&record)?;
        self.broadcaster.send_to_others_in_group(
            record.group_name(),
            connection_id,
            OutboundEvent::notification(format!("{} has left the conversation", record.name())),
        );
        self.broadcaster
            .remove_from_group(connection_id, record.group_name());
        info!(connection_id, name = record.name(), "disconnected");

        Ok(Some(record))
    }

    /// Informational only; a dropped identity is not restored.
    pub fn reconnect(&self, connection_id: &str) {
        self.broadcaster.send_to_caller(
            connection_id,
            OutboundEvent::notification("You have been reconnected"),
        );
        info!(connection_id, "reconnected");
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn identified(&self, connection_id: &str) -> Result<IdentityRecord, RouterError> {
        match self.registry.get_by_connection_id(connection_id)? {
            Some(record) => Ok(record),
            None => {
                warn!(connection_id, "no identity for connection");
                Err(RouterError::NotIdentified)
            }
        }
    }

    /// First-join side effects: membership, the joined notice, the greeting.
    ///
    /// The group is read before anything is sent. If that read fails the
    /// new record is taken back and nobody hears about the join.
    fn welcome(&self, record: &IdentityRecord) -> Result<(), RouterError> {
        let connection_id = record.connection_id();
        let group = record.group_name();

        let members = match self.registry.group_members(group) {
            Ok(members) => members,
            Err(err) => {
                if let Err(undo) = self.registry.remove(record) {
                    warn!(connection_id, error = %undo, "failed to roll back join");
                }
                return Err(err.into());
            }
        };
        let others: Vec<String> = members
            .into_iter()
            .filter(|member| member.connection_id() != connection_id)
            .map(|member| member.name().to_string())
            .collect();

        self.broadcaster.add_to_group(connection_id, group);
        self.broadcaster.send_to_others_in_group(
            group,
            connection_id,
            OutboundEvent::notification(format!(
                "{} has joined the conversation, say Hi",
                record.name()
            )),
        );
        self.broadcaster
            .send_to_caller(connection_id, OutboundEvent::notification(greeting(&others)));

        Ok(())
    }
}

/// Keep at most `max_chars` characters, then trim surrounding whitespace.
pub fn truncate_and_trim(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    };
    cut.trim().to_string()
}

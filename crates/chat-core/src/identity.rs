//! Identity record: who is behind a connection, and where they are.

use crate::error::RegistryError;

/// Binds a transport connection to a display name and a group.
///
/// Immutable once built. A rename or group change is a new record that
/// replaces the old one in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    name: String,
    connection_id: String,
    group_name: String,
}

impl IdentityRecord {
    /// Build a record, rejecting blank fields.
    ///
    /// `group_name` is stored lower-cased.
    pub fn new(
        name: impl Into<String>,
        connection_id: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        let connection_id = connection_id.into();
        let group_name = group_name.into();

        require_non_blank("name", &name)?;
        require_non_blank("connection_id", &connection_id)?;
        require_non_blank("group_name", &group_name)?;

        Ok(IdentityRecord {
            name,
            connection_id,
            group_name: group_name.to_lowercase(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Case-folded name; two records with equal keys compete for one slot.
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Case-folds a display name into its uniqueness key.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

fn require_non_blank(field: &'static str, value: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        Err(RegistryError::InvalidIdentity { field })
    } else {
        Ok(())
    }
}

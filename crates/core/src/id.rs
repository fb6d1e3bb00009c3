//! Strongly-typed identifiers used across the domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Declares a UUID-backed id newtype. Fresh ids are UUIDv7, so they sort by
/// creation time.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {e}", stringify!($name))))
            }
        }
    };
}

uuid_id! {
    /// One restaurant or venue. Every stream and read model is scoped by it.
    TenantId
}

uuid_id! {
    /// Identity of an event stream: an inventory item, menu item or recipe.
    AggregateId
}

impl AggregateId {
    /// Stable id derived from another aggregate's id (UUIDv5 over `kind`).
    ///
    /// A menu item maps to exactly one recipe stream this way.
    pub fn derived(parent: AggregateId, kind: &str) -> Self {
        Self(Uuid::new_v5(&parent.0, kind.as_bytes()))
    }
}

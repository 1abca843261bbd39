// Network Credentials
//
// Ordered identifier/secret pairs; priority is list order. Supplied by the
// preferences store, read-only to the join procedure.

use crate::join::JoinError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most credentials the preferences store can hold
pub const MAX_CREDENTIALS: usize = 3;

/// One network the node may join
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Network name (SSID)
    pub identifier: String,
    /// Passphrase; empty for open networks
    #[serde(default)]
    pub secret: String,
}

impl Credential {
    pub fn new(identifier: &str, secret: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Unset preference slots have an empty identifier
    pub fn is_set(&self) -> bool {
        !self.identifier.is_empty()
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Priority-ordered credential list, bounded by `MAX_CREDENTIALS`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Credential>", into = "Vec<Credential>")]
pub struct CredentialList {
    entries: Vec<Credential>,
}

impl CredentialList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(entries: Vec<Credential>) -> Result<Self, JoinError> {
        if entries.len() > MAX_CREDENTIALS {
            return Err(JoinError::TooManyCredentials {
                count: entries.len(),
                max: MAX_CREDENTIALS,
            });
        }
        Ok(Self { entries })
    }

    pub fn push(&mut self, credential: Credential) -> Result<(), JoinError> {
        if self.entries.len() >= MAX_CREDENTIALS {
            return Err(JoinError::TooManyCredentials {
                count: self.entries.len() + 1,
                max: MAX_CREDENTIALS,
            });
        }
        self.entries.push(credential);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter()
    }

    /// Configured entries in priority order, with their slot index
    pub fn usable(&self) -> impl Iterator<Item = (usize, &Credential)> {
        self.entries.iter().enumerate().filter(|(_, c)| c.is_set())
    }

    pub fn has_usable(&self) -> bool {
        self.usable().next().is_some()
    }
}

impl TryFrom<Vec<Credential>> for CredentialList {
    type Error = JoinError;

    fn try_from(entries: Vec<Credential>) -> Result<Self, Self::Error> {
        Self::from_vec(entries)
    }
}

impl From<CredentialList> for Vec<Credential> {
    fn from(list: CredentialList) -> Self {
        list.entries
    }
}

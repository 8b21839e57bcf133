//! Session hashes for queue joins.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Short random identifier tying the messages of one invocation together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHash(String);

impl SessionHash {
    /// Characters kept from the random UUID.
    pub const LEN: usize = 11;

    /// Fresh hash from a random v4 UUID.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self(id.chars().take(Self::LEN).collect())
    }

    /// Wrap an existing hash.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// The hash text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

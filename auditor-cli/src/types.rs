//! Common types used across CLI modules

use anyhow::{Result, anyhow};
use uuid::Uuid;

/// A full id, or a prefix that should match exactly one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    Full(Uuid),
    /// Lowercased, hyphens allowed
    Prefix(String),
}

impl IdOrPrefix {
    /// Parses user input, trying a full UUID first
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Ok(uuid) = Uuid::parse_str(input) {
            return Ok(IdOrPrefix::Full(uuid));
        }

        if input.is_empty() {
            return Err(anyhow!("id cannot be empty"));
        }
        if !input.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(anyhow!("'{}' is not an id or id prefix", input));
        }

        Ok(IdOrPrefix::Prefix(input.to_ascii_lowercase()))
    }

    /// Get the UUID if this is a full ID
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            IdOrPrefix::Full(uuid) => Some(*uuid),
            IdOrPrefix::Prefix(_) => None,
        }
    }

    /// Whether `id` is the referenced id or starts with the prefix
    ///
    /// Prefixes match both the hyphenated and the short (simple) form.
    pub fn matches(&self, id: &Uuid) -> bool {
        match self {
            IdOrPrefix::Full(uuid) => uuid == id,
            IdOrPrefix::Prefix(prefix) => {
                id.hyphenated().to_string().starts_with(prefix.as_str())
                    || id.simple().to_string().starts_with(prefix.as_str())
            }
        }
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of one checkout-to-return episode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldId(Uuid);

impl HoldId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7, so ids sort roughly by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HoldId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for HoldId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for HoldId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("HoldId: {e}")))
    }
}

/// Opaque reference to a directory entry (team member) holding a tool.
///
/// The directory service resolves people; this crate only carries the handle
/// it hands out and never checks it against the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HolderId(String);

impl HolderId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("HolderId: cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for HolderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HolderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HolderId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<HolderId> for String {
    fn from(value: HolderId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_id_is_trimmed() {
        let holder = HolderId::parse("  mike ").unwrap();
        assert_eq!(holder.as_str(), "mike");
    }

    #[test]
    fn blank_holder_id_is_rejected() {
        let err = HolderId::parse("   ").unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }

    #[test]
    fn holder_id_deserialization_validates() {
        let err = serde_json::from_str::<HolderId>("\"\"");
        assert!(err.is_err());
        let ok: HolderId = serde_json::from_str("\"sarah\"").unwrap();
        assert_eq!(ok.as_str(), "sarah");
    }

    #[test]
    fn hold_id_round_trips_through_display() {
        let id = HoldId::new();
        let parsed: HoldId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_hold_id_is_an_invalid_id() {
        let err = "not-a-uuid".parse::<HoldId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("HoldId:")));
    }
}

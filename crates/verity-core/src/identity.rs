// crates/verity-core/src/identity.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a participant on the Verity network.
///
/// Participants submit claims, validate claims, or both. The identifier is
/// opaque to this crate (a DID, a public key in hex, an account address);
/// ordering on it is what makes commitments and collusion reports
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

/// Validators are participants; the alias keeps signatures readable.
pub type ValidatorId = ParticipantId;

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier, which requests must never carry.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_lexicographically() {
        let mut ids = vec![ParticipantId::from("carol"), "alice".into(), "bob".into()];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn whitespace_id_is_empty() {
        assert!(ParticipantId::from("  ").is_empty());
        assert!(!ParticipantId::from("did:verity:1").is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ParticipantId::from("v1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"v1\"");
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Unique identifier for a clan, assigned when the host forms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ClanId(pub Uuid);

impl ClanId {
    /// Creates a new random `ClanId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a node within a clan, e.g. `host-3f9a01c2` or `worker-77d0e1aa`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct NodeId(pub String);

impl NodeId {
    /// Creates a `NodeId` from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates `<prefix>-<8 hex chars>`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}-{}", &suffix[..8]))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An opaque admission token.
///
/// Comparison against a presented token runs in constant time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Credential(String);

impl Credential {
    /// Wraps an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh 32-character random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns `true` if `presented` equals this token.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len() && bool::from(expected.ct_eq(presented))
    }

    /// Returns the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Tokens must never end up in logs through `{:?}`.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_matches_only_exact_token() {
        let cred = Credential::new("secret-token");
        assert!(cred.matches("secret-token"));
        assert!(!cred.matches("secret-tokem"));
        assert!(!cred.matches("secret"));
        assert!(!cred.matches(""));
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = Credential::new("do-not-print");
        let shown = format!("{cred:?}");
        assert!(!shown.contains("do-not-print"), "debug output leaked token: {shown}");
    }

    #[test]
    fn generated_credentials_are_distinct() {
        let a = Credential::generate();
        let b = Credential::generate();
        assert_ne!(a, b);
        assert_eq!(a.expose().len(), 32);
    }

    #[test]
    fn node_id_generate_uses_prefix() {
        let id = NodeId::generate("worker");
        assert!(id.as_str().starts_with("worker-"), "got {id}");
        assert_eq!(id.as_str().len(), "worker-".len() + 8);
    }
}

//! Verified claim sets

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the claim carrying granted permission strings
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// Claims of a token whose signature and standard claims have been verified
///
/// The payload is kept exactly as decoded; accessors only read from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Wrap a decoded payload
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Look up a claim by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Subject (`sub`), if it is a string
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Whether a `permissions` claim is present at all
    pub fn has_permissions_claim(&self) -> bool {
        self.0.contains_key(PERMISSIONS_CLAIM)
    }

    /// Whether the `permissions` claim literally contains `permission`
    ///
    /// Arrays are searched for an equal string element; a bare string claim
    /// must equal the permission exactly.
    pub fn has_permission(&self, permission: &str) -> bool {
        match self.get(PERMISSIONS_CLAIM) {
            Some(Value::Array(granted)) => granted.iter().any(|p| p.as_str() == Some(permission)),
            Some(Value::String(granted)) => granted == permission,
            _ => false,
        }
    }

    /// Granted permission strings, ignoring non-string entries
    pub fn permissions(&self) -> Vec<&str> {
        match self.get(PERMISSIONS_CLAIM) {
            Some(Value::Array(granted)) => granted.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(granted)) => vec![granted.as_str()],
            _ => Vec::new(),
        }
    }

    /// The raw claim map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the raw claim map
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

//! Known-bad transfer identities
//!
//! Transfers whose content address is on this list are never reported
//! ready, no matter how complete the payload is.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Set of content addresses barred from serving
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenyList {
    entries: HashSet<String>,
}

impl DenyList {
    /// Create an empty deny list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity to the list
    ///
    /// Returns `false` if the identity was already present.
    pub fn insert(&mut self, identity: impl Into<String>) -> bool {
        self.entries.insert(identity.into())
    }

    /// Check whether an identity is barred
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains(identity)
    }

    /// Number of barred identities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<String> for DenyList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

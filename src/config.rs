//! Store configuration
//!
//! This module contains the policy knobs shared by every transfer in a
//! store.

use crate::denylist::DenyList;
use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Default number of slot buckets the piece space is divided into
pub const DEFAULT_BUCKET_COUNT: u32 = 10;

/// Policy configuration shared by every transfer in a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of slot buckets piece windows are spread across
    ///
    /// A transfer in slot `s` anchors its window at
    /// `total_pieces * s / bucket_count`, so co-hosted transfers pull
    /// different regions of their swarms.
    pub bucket_count: u32,

    /// Identities that must never be reported ready
    #[serde(default)]
    pub deny_list: DenyList,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            deny_list: DenyList::new(),
        }
    }
}

impl StoreConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of slot buckets
    pub fn bucket_count(mut self, count: u32) -> Self {
        self.bucket_count = count;
        self
    }

    /// Set the deny list
    pub fn deny_list(mut self, deny_list: DenyList) -> Self {
        self.deny_list = deny_list;
        self
    }

    /// Add a single identity to the deny list
    pub fn deny(mut self, identity: impl Into<String>) -> Self {
        self.deny_list.insert(identity);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(StoreError::invalid_input(
                "bucket_count",
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

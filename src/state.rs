//! Transfer lifecycle states and status snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current state of a managed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    /// Waiting for engine metadata; the dispatch loop is not serving yet
    Pending,
    /// Piece requests cancelled and the budget zeroed
    Paused,
    /// Actively requesting piece windows
    Running,
    /// Payload fully fetched and served back to the swarm
    Seeding,
}

impl TransferState {
    /// Check if the transfer is active (running or seeding)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Seeding)
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paused => write!(f, "paused"),
            Self::Running => write!(f, "running"),
            Self::Seeding => write!(f, "seeding"),
        }
    }
}

/// Point-in-time snapshot of a transfer, for logs and status surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Content address of the transfer
    pub identity: String,
    /// Lifecycle state at snapshot time
    pub state: TransferState,
    /// Byte quota granted so far
    pub bytes_requested: u64,
    /// Bytes fetched and verified by the engine
    pub bytes_completed: u64,
    /// Total payload size (None until metadata arrives)
    pub total_length: Option<u64>,
    /// Number of pieces (None until metadata arrives)
    pub piece_count: Option<u32>,
    /// Piece budget submitted to the engine so far
    pub max_pieces: u32,
    /// Number of files in the payload
    pub file_count: usize,
    /// External consumers currently holding the transfer
    pub ref_count: i32,
    /// Wall-clock time the transfer was created
    pub added_at: DateTime<Utc>,
    /// Time elapsed since creation
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(TransferState::Pending.to_string(), "pending");
        assert_eq!(TransferState::Seeding.to_string(), "seeding");
    }

    #[test]
    fn test_is_active() {
        assert!(TransferState::Running.is_active());
        assert!(TransferState::Seeding.is_active());
        assert!(!TransferState::Pending.is_active());
        assert!(!TransferState::Paused.is_active());
    }
}

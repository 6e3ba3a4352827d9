//! Typed errors for swarmstore
//!
//! Every error type includes context about what went wrong and whether
//! the operation can be retried.

use crate::state::TransferState;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for transfer policy operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Engine metadata (piece count, total length) has not arrived yet
    #[error("Transfer metadata not ready")]
    NotReady,

    /// Invalid state transition
    #[error("Invalid state: cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: TransferState,
    },

    /// Writing the transfer descriptor failed
    #[error("Descriptor error at {path:?}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid input from user
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    /// Transfer is shutting down
    #[error("Transfer is shutting down")]
    Shutdown,
}

impl StoreError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady)
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &'static str, state: TransferState) -> Self {
        Self::InvalidState { action, state }
    }

    /// Create a descriptor error
    pub fn descriptor(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Descriptor {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for transfer operations
pub type Result<T> = std::result::Result<T, StoreError>;

//! External engine facade
//!
//! The wire protocol, peer management, hashing and on-disk piece storage all
//! live in an external torrent engine. This module defines the narrow slice
//! of that engine the policy layer is allowed to touch; everything else
//! about the engine stays invisible behind the trait.

use crate::scheduler::PieceRange;
use serde::{Deserialize, Serialize};
use std::io;

/// Immutable facts the engine learns when a transfer's metadata resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInfo {
    /// Number of pieces in the payload
    pub piece_count: u32,
    /// Total payload size in bytes
    pub total_length: u64,
}

/// Per-transfer handle into the external torrent engine
///
/// Piece commands are fire-and-forget: the engine owns queuing, peer
/// selection and completion, while this layer only decides what to ask
/// for. Implementations must tolerate calls from multiple tasks at once.
pub trait EngineHandle: Send + Sync {
    /// Engine metadata for this transfer, `None` until the info
    /// dictionary has been fetched
    fn info(&self) -> Option<TransferInfo>;

    /// Bytes fetched and verified so far
    fn bytes_completed(&self) -> u64;

    /// Whether the engine reports the payload complete and being served
    fn is_seeding(&self) -> bool;

    /// Relative paths of the files in the payload, empty before metadata
    /// resolves
    fn files(&self) -> Vec<String>;

    /// Ask the engine to fetch every piece in `range`
    fn download_pieces(&self, range: PieceRange);

    /// Cancel outstanding requests for every piece in `range`
    fn cancel_pieces(&self, range: PieceRange);

    /// Drop the engine-side resources for this transfer
    ///
    /// Called once, after the dispatch loop has exited; no piece commands
    /// follow it.
    fn release(&self);

    /// Serialize the transfer descriptor in the engine's wire format
    fn write_descriptor(&self, out: &mut dyn io::Write) -> io::Result<()>;
}

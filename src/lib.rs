//! # swarmstore
//!
//! Quota-aware lifecycle management for content-addressed storage
//! transfers riding on an external torrent engine.
//!
//! ## Features
//!
//! - **Byte quotas**: Each transfer fetches only as much of the payload as
//!   its quota buys, rounded up to whole pieces
//! - **Window spreading**: Piece windows are anchored per-slot so
//!   co-hosted transfers pull different regions of their swarms
//! - **Single dispatch loop**: One background task per transfer hands
//!   windows to the engine, with bounded backpressure on submitters
//! - **Graceful teardown**: `stop` drains the loop before the engine
//!   handle is released, and both are safe to call in any order
//! - **Engine-agnostic**: The torrent engine sits behind a small trait;
//!   nothing here touches the wire
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swarmstore::{EngineHandle, ManagedTransfer, PieceRange, StoreConfig, TransferInfo};
//!
//! // An adapter over your torrent engine
//! struct Handle;
//!
//! impl EngineHandle for Handle {
//!     fn info(&self) -> Option<TransferInfo> {
//!         Some(TransferInfo { piece_count: 512, total_length: 256 << 20 })
//!     }
//!     fn bytes_completed(&self) -> u64 { 0 }
//!     fn is_seeding(&self) -> bool { false }
//!     fn files(&self) -> Vec<String> { vec!["model.bin".into()] }
//!     fn download_pieces(&self, _range: PieceRange) {}
//!     fn cancel_pieces(&self, _range: PieceRange) {}
//!     fn release(&self) {}
//!     fn write_descriptor(&self, _out: &mut dyn std::io::Write) -> std::io::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transfer = ManagedTransfer::new(
//!         Arc::new(Handle),
//!         "6ad9cbeef6dc3d61aa8d8f9d89529f5792d64304",
//!         "/var/lib/swarmstore/6ad9cbee",
//!         64 << 20,
//!         3,
//!         StoreConfig::default(),
//!     )?;
//!
//!     transfer.start();
//!
//!     // Raise the quota and submit the wider window
//!     transfer.set_bytes_requested(128 << 20);
//!     transfer.request_more().await?;
//!
//!     transfer.stop().await;
//!     Ok(())
//! }
//! ```

// Modules
pub mod config;
pub mod denylist;
pub mod engine;
pub mod error;
pub mod job;
pub mod progress;
pub mod scheduler;
pub mod state;
pub mod transfer;

// Re-exports for convenience
pub use config::{StoreConfig, DEFAULT_BUCKET_COUNT};
pub use denylist::DenyList;
pub use engine::{EngineHandle, TransferInfo};
pub use error::{Result, StoreError};
pub use job::Job;
pub use scheduler::{piece_budget, piece_window, slot_for, PieceRange};
pub use state::{TransferState, TransferStatus};
pub use transfer::{ManagedTransfer, DESCRIPTOR_FILE};

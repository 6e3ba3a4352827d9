//! Managed transfer walkthrough
//!
//! Drives one transfer through its whole lifecycle over a simulated engine:
//! descriptor write, dispatch loop startup, stepwise quota raises, seeding,
//! and teardown.
//!
//! Usage: cargo run --example transfer_demo

use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use swarmstore::progress::{human_bytes, progress_bar};
use swarmstore::{EngineHandle, ManagedTransfer, PieceRange, StoreConfig, TransferInfo};

const PIECE_COUNT: u32 = 200;
const PIECE_SIZE: u64 = 1 << 18; // 256 KiB
const TOTAL_LENGTH: u64 = PIECE_COUNT as u64 * PIECE_SIZE;

/// Engine that instantly "fetches" every piece it is asked for
#[derive(Default)]
struct SimulatedEngine {
    fetched: Mutex<HashSet<u32>>,
}

impl EngineHandle for SimulatedEngine {
    fn info(&self) -> Option<TransferInfo> {
        Some(TransferInfo {
            piece_count: PIECE_COUNT,
            total_length: TOTAL_LENGTH,
        })
    }

    fn bytes_completed(&self) -> u64 {
        self.fetched.lock().len() as u64 * PIECE_SIZE
    }

    fn is_seeding(&self) -> bool {
        self.fetched.lock().len() as u32 == PIECE_COUNT
    }

    fn files(&self) -> Vec<String> {
        vec!["dataset.bin".to_string()]
    }

    fn download_pieces(&self, range: PieceRange) {
        let mut fetched = self.fetched.lock();
        for piece in range.start..range.end {
            fetched.insert(piece);
        }
    }

    fn cancel_pieces(&self, _range: PieceRange) {}

    fn release(&self) {}

    fn write_descriptor(&self, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(b"d4:name11:dataset.bine")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("swarmstore-demo");
    std::fs::create_dir_all(&dir)?;

    let engine = Arc::new(SimulatedEngine::default());
    let transfer = ManagedTransfer::new(
        engine,
        "6ad9cbeef6dc3d61aa8d8f9d89529f5792d64304",
        &dir,
        0,
        3,
        StoreConfig::default(),
    )?;

    transfer.write_descriptor()?;
    println!("Descriptor written under {}", dir.display());

    transfer.start();
    while !transfer.is_running() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Raise the quota in four steps; each submits a wider window
    for quota in [
        TOTAL_LENGTH / 4,
        TOTAL_LENGTH / 2,
        3 * TOTAL_LENGTH / 4,
        TOTAL_LENGTH,
    ] {
        transfer.set_bytes_requested(quota);
        transfer.request_more().await?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = transfer.status();
        println!(
            "quota {:>9} -> {} pieces submitted, {} fetched {}",
            human_bytes(quota),
            status.max_pieces,
            human_bytes(status.bytes_completed),
            progress_bar(status.bytes_completed, TOTAL_LENGTH),
        );
    }

    if transfer.seed() {
        println!("Transfer is seeding, ready = {}", transfer.ready());
    }

    transfer.stop().await;
    println!("Stopped.");
    Ok(())
}

//! Managed transfers
//!
//! `ManagedTransfer` wraps one engine-provided transfer handle with the
//! policy that decides how much of the payload to fetch and when: a byte
//! quota, the grow-only piece window derived from it, a four-state
//! lifecycle, and a single background dispatch loop feeding window requests
//! into the engine until told to stop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::engine::{EngineHandle, TransferInfo};
use crate::error::{Result, StoreError};
use crate::progress::{human_bytes, progress_bar, scale_bar};
use crate::scheduler::{piece_budget, piece_window, PieceRange};
use crate::state::{TransferState, TransferStatus};

/// Name of the descriptor file written under a transfer's storage path
pub const DESCRIPTOR_FILE: &str = "torrent";

/// Fields guarded by the transfer's state lock
#[derive(Debug)]
struct Inner {
    state: TransferState,
    bytes_requested: u64,
    max_pieces: u32,
}

/// Dispatch loop bookkeeping, latched under one mutex
struct DispatchState {
    rx: Option<mpsc::Receiver<PieceRange>>,
    worker: Option<JoinHandle<()>>,
}

/// One content-addressed transfer under policy management
///
/// Constructed with [`ManagedTransfer::new`], driven by [`start`], fed by
/// [`request_more`], and torn down by [`stop`]. All methods take `&self`;
/// the transfer is meant to be shared behind its `Arc`.
///
/// [`start`]: ManagedTransfer::start
/// [`request_more`]: ManagedTransfer::request_more
/// [`stop`]: ManagedTransfer::stop
pub struct ManagedTransfer {
    engine: Arc<dyn EngineHandle>,
    identity: String,
    storage_path: PathBuf,
    slot: u32,
    config: StoreConfig,
    created_at: Instant,
    added_at: DateTime<Utc>,
    refs: AtomicI32,
    inner: RwLock<Inner>,
    // Locked per submission; keeps the grow-only check atomic with the
    // handoff
    task_tx: tokio::sync::Mutex<mpsc::Sender<PieceRange>>,
    dispatch: Mutex<DispatchState>,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

impl ManagedTransfer {
    /// Wrap an engine handle in a new pending transfer
    ///
    /// `requested` seeds the byte quota and `slot` fixes where this
    /// transfer's piece windows sit in the piece index space. The
    /// configuration is validated up front; an invalid one is rejected
    /// with [`StoreError::InvalidInput`]. Nothing runs until
    /// [`start`](ManagedTransfer::start) is called.
    pub fn new(
        engine: Arc<dyn EngineHandle>,
        identity: impl Into<String>,
        storage_path: impl Into<PathBuf>,
        requested: u64,
        slot: u32,
        config: StoreConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        // Capacity 1: the loop takes one window at a time and callers
        // queue at most one more behind it
        let (task_tx, task_rx) = mpsc::channel(1);
        Ok(Arc::new(Self {
            engine,
            identity: identity.into(),
            storage_path: storage_path.into(),
            slot,
            config,
            created_at: Instant::now(),
            added_at: Utc::now(),
            refs: AtomicI32::new(0),
            inner: RwLock::new(Inner {
                state: TransferState::Pending,
                bytes_requested: requested,
                max_pieces: 0,
            }),
            task_tx: tokio::sync::Mutex::new(task_tx),
            dispatch: Mutex::new(DispatchState {
                rx: Some(task_rx),
                worker: None,
            }),
            shutdown: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }))
    }

    /// Content address of the transfer
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Directory the transfer's payload and descriptor live under
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Slot this transfer's piece windows are anchored to
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Monotonic creation time
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the transfer was created
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Engine metadata, `None` until the info dictionary arrives
    pub fn info(&self) -> Option<TransferInfo> {
        self.engine.info()
    }

    /// Bytes fetched and verified by the engine
    pub fn bytes_completed(&self) -> u64 {
        self.engine.bytes_completed()
    }

    /// Number of external consumers currently relying on this transfer
    pub fn ref_count(&self) -> i32 {
        self.refs.load(Ordering::Relaxed)
    }

    /// Record one more consumer; pair every call with [`decr_ref`]
    ///
    /// [`decr_ref`]: ManagedTransfer::decr_ref
    pub fn incr_ref(&self) {
        self.refs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one consumer gone
    pub fn decr_ref(&self) {
        self.refs.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current byte quota
    pub fn bytes_requested(&self) -> u64 {
        self.inner.read().bytes_requested
    }

    /// Replace the byte quota
    ///
    /// Callers normally only raise it; lowering the quota never shrinks a
    /// window that was already submitted.
    pub fn set_bytes_requested(&self, bytes: u64) {
        self.inner.write().bytes_requested = bytes;
    }

    /// Piece budget submitted to the engine so far
    pub fn max_pieces(&self) -> u32 {
        self.inner.read().max_pieces
    }

    /// Check whether the quota already covers the whole payload
    ///
    /// Always `false` before metadata arrives.
    pub fn quota_saturated(&self) -> bool {
        match self.engine.info() {
            Some(info) => self.inner.read().bytes_requested >= info.total_length,
            None => false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransferState {
        self.inner.read().state
    }

    /// Check for the pending state
    pub fn is_pending(&self) -> bool {
        self.state() == TransferState::Pending
    }

    /// Check for the running state
    pub fn is_running(&self) -> bool {
        self.state() == TransferState::Running
    }

    /// Check for the paused state
    pub fn is_paused(&self) -> bool {
        self.state() == TransferState::Paused
    }

    /// Check that the transfer is seeding and the engine still agrees
    pub fn is_seeding(&self) -> bool {
        self.inner.read().state == TransferState::Seeding && self.engine.is_seeding()
    }

    /// Check whether downstream readers may use this transfer
    ///
    /// True only for a seeding transfer whose identity is not on the deny
    /// list.
    pub fn ready(&self) -> bool {
        if self.config.deny_list.contains(&self.identity) {
            tracing::debug!("Transfer {} is deny-listed", self.identity);
            return false;
        }
        self.is_seeding()
    }

    /// Promote a running transfer to seeding once the engine reports the
    /// payload complete
    ///
    /// Returns `true` if the transfer is seeding afterwards. Calling it on
    /// a transfer that is already seeding is a no-op that returns `true`;
    /// anything short of a complete running transfer returns `false` and
    /// changes nothing.
    pub fn seed(&self) -> bool {
        if self.engine.info().is_none() {
            tracing::debug!("Cannot seed {}: metadata not ready", self.identity);
            return false;
        }
        {
            let inner = self.inner.read();
            match inner.state {
                TransferState::Seeding => return true,
                TransferState::Running => {}
                _ => return false,
            }
        }
        if !self.engine.is_seeding() {
            return false;
        }
        {
            // Re-check under the write lock; a pause may have slipped in
            let mut inner = self.inner.write();
            match inner.state {
                TransferState::Seeding => return true,
                TransferState::Running => inner.state = TransferState::Seeding,
                _ => return false,
            }
        }

        let completed = self.engine.bytes_completed();
        let pieces = self.engine.info().map_or(0, |info| info.piece_count);
        let files = self.engine.files().len();
        let elapsed = self.created_at.elapsed();
        let speed = completed as f64 / elapsed.as_secs_f64().max(f64::MIN_POSITIVE);
        tracing::info!(
            "Imported new storage segment {}: {} in {} files, {} pieces, took {:?} at {}/s",
            self.identity,
            human_bytes(completed),
            files,
            pieces,
            elapsed,
            human_bytes(speed as u64),
        );
        true
    }

    /// Pause the transfer: zero the piece budget and cancel outstanding
    /// requests
    ///
    /// Idempotent. Before metadata arrives there is nothing to cancel, so
    /// only the state changes.
    pub fn pause(&self) {
        {
            let mut inner = self.inner.write();
            if inner.state == TransferState::Paused {
                return;
            }
            inner.state = TransferState::Paused;
            inner.max_pieces = 0;
        }
        if let Some(info) = self.engine.info() {
            self.engine
                .cancel_pieces(PieceRange::new(0, info.piece_count));
            tracing::debug!(
                "Paused {}: cancelled {} pieces",
                self.identity,
                info.piece_count
            );
        } else {
            tracing::debug!("Paused {} before metadata arrived", self.identity);
        }
    }

    /// Recompute the piece budget from the current quota and, if it grew,
    /// hand the new window to the dispatch loop
    ///
    /// The handoff queue holds a single window. If the loop has not picked
    /// up the previous one this call waits, and a concurrent
    /// [`stop`](ManagedTransfer::stop) aborts the wait with
    /// [`StoreError::Shutdown`]. A budget at or below what was already
    /// submitted returns without doing anything.
    pub async fn request_more(&self) -> Result<()> {
        let info = self.engine.info().ok_or(StoreError::NotReady)?;

        // One submitter at a time; a racing caller must see this call's
        // budget before it runs its own grow-only check
        let task_tx = self.task_tx.lock().await;
        let (budget, range) = {
            let inner = self.inner.read();
            if inner.state != TransferState::Running {
                return Err(StoreError::invalid_state("request pieces", inner.state));
            }
            let budget = piece_budget(inner.bytes_requested, info.piece_count, info.total_length);
            if budget <= inner.max_pieces {
                return Ok(());
            }
            let range = piece_window(info.piece_count, self.slot, self.config.bucket_count, budget);
            (budget, range)
        };

        tokio::select! {
            sent = task_tx.send(range) => {
                if sent.is_err() {
                    return Err(StoreError::Shutdown);
                }
            }
            _ = self.shutdown.cancelled() => return Err(StoreError::Shutdown),
        }

        {
            let mut inner = self.inner.write();
            inner.max_pieces = inner.max_pieces.max(budget);
        }

        tracing::info!(
            "{} {}: slot {}, window {} of {} pieces",
            scale_bar(range.start, range.end, info.piece_count),
            self.identity,
            self.slot,
            range,
            info.piece_count,
        );
        Ok(())
    }

    /// Launch the dispatch loop
    ///
    /// The first call wins; later calls, concurrent calls and any call
    /// after [`stop`](ManagedTransfer::stop) return without effect.
    pub fn start(self: &Arc<Self>) {
        let mut dispatch = self.dispatch.lock();
        // Check under the dispatch lock; a stop may have slipped in
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let Some(rx) = dispatch.rx.take() else {
            return;
        };
        dispatch.worker = Some(tokio::spawn(Arc::clone(self).dispatch_loop(rx)));
    }

    /// Signal the dispatch loop, wait for it to exit, then release the
    /// engine handle
    ///
    /// The first call wins; repeat and concurrent calls return
    /// immediately. Safe to call whether or not the loop ever started, and
    /// the engine handle is only released once the loop can no longer
    /// reach it.
    pub async fn stop(&self) {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        // Cancel and detach the worker under the dispatch lock; a racing
        // start either sees the latch or hands its worker over here
        let worker = {
            let mut dispatch = self.dispatch.lock();
            self.shutdown.cancel();
            dispatch.worker.take()
        };
        if let Some(worker) = worker {
            if worker.await.is_err() {
                tracing::warn!("Dispatch loop for {} ended abnormally", self.identity);
            }
        }

        let completed = self.engine.bytes_completed();
        let total = self.engine.info().map_or(0, |info| info.total_length);
        let (state, requested) = {
            let inner = self.inner.read();
            (inner.state, inner.bytes_requested)
        };
        tracing::info!(
            "{} {} stopped: {} of {} fetched, {} requested, state {}, refs {}",
            progress_bar(completed, total),
            self.identity,
            human_bytes(completed),
            human_bytes(total),
            human_bytes(requested),
            state,
            self.ref_count(),
        );
        self.engine.release();
    }

    /// Write the engine's transfer descriptor under the storage path
    ///
    /// Skips silently if the file already exists. Failures surface to the
    /// caller and are not retried.
    pub fn write_descriptor(&self) -> Result<()> {
        let _guard = self.inner.write();
        let path = self.storage_path.join(DESCRIPTOR_FILE);
        if path.exists() {
            return Ok(());
        }
        let mut file = std::fs::File::create(&path).map_err(|e| StoreError::descriptor(&path, e))?;
        self.engine
            .write_descriptor(&mut file)
            .map_err(|e| StoreError::descriptor(&path, e))?;
        tracing::debug!(
            "Wrote descriptor for {} to {}",
            self.identity,
            path.display()
        );
        Ok(())
    }

    /// Point-in-time snapshot for logs and status surfaces
    pub fn status(&self) -> TransferStatus {
        let info = self.engine.info();
        let bytes_completed = self.engine.bytes_completed();
        let file_count = self.engine.files().len();
        let inner = self.inner.read();
        TransferStatus {
            identity: self.identity.clone(),
            state: inner.state,
            bytes_requested: inner.bytes_requested,
            bytes_completed,
            total_length: info.map(|i| i.total_length),
            piece_count: info.map(|i| i.piece_count),
            max_pieces: inner.max_pieces,
            file_count,
            ref_count: self.refs.load(Ordering::Relaxed),
            added_at: self.added_at,
            elapsed: self.created_at.elapsed(),
        }
    }

    /// Try the pending-to-running transition at loop startup
    fn make_running(&self) -> bool {
        if self.engine.info().is_none() {
            tracing::warn!(
                "Dispatch loop for {} not ready: engine metadata absent",
                self.identity
            );
            return false;
        }
        let mut inner = self.inner.write();
        match inner.state {
            TransferState::Pending => {
                inner.state = TransferState::Running;
                true
            }
            state => state == TransferState::Running,
        }
    }

    /// Serve piece window requests until shutdown
    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::Receiver<PieceRange>) {
        if !self.make_running() {
            return;
        }
        tracing::info!("Dispatch loop for {} started", self.identity);
        loop {
            tokio::select! {
                task = rx.recv() => match task {
                    Some(range) => self.engine.download_pieces(range),
                    None => break,
                },
                _ = self.shutdown.cancelled() => break,
            }
        }
        tracing::info!("Dispatch loop for {} stopped", self.identity);
    }
}

impl std::fmt::Debug for ManagedTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ManagedTransfer")
            .field("identity", &self.identity)
            .field("state", &inner.state)
            .field("bytes_requested", &inner.bytes_requested)
            .field("max_pieces", &inner.max_pieces)
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};

    /// Minimal engine stub for lock-level tests; loop behavior is covered
    /// by the integration tests
    #[derive(Default)]
    struct StubEngine {
        info: RwLock<Option<TransferInfo>>,
        seeding: AtomicBool,
        completed: AtomicU64,
        cancels: Mutex<Vec<PieceRange>>,
        released: AtomicBool,
        descriptor_writes: AtomicU32,
    }

    impl StubEngine {
        fn with_info(piece_count: u32, total_length: u64) -> Arc<Self> {
            let stub = Self::default();
            *stub.info.write() = Some(TransferInfo {
                piece_count,
                total_length,
            });
            Arc::new(stub)
        }
    }

    impl EngineHandle for StubEngine {
        fn info(&self) -> Option<TransferInfo> {
            *self.info.read()
        }

        fn bytes_completed(&self) -> u64 {
            self.completed.load(Ordering::Relaxed)
        }

        fn is_seeding(&self) -> bool {
            self.seeding.load(Ordering::Relaxed)
        }

        fn files(&self) -> Vec<String> {
            vec![]
        }

        fn download_pieces(&self, _range: PieceRange) {}

        fn cancel_pieces(&self, range: PieceRange) {
            self.cancels.lock().push(range);
        }

        fn release(&self) {
            self.released.store(true, Ordering::Relaxed);
        }

        fn write_descriptor(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
            self.descriptor_writes.fetch_add(1, Ordering::Relaxed);
            out.write_all(b"d4:infod6:lengthi1024eee")
        }
    }

    fn transfer_over(engine: Arc<StubEngine>, requested: u64) -> Arc<ManagedTransfer> {
        ManagedTransfer::new(
            engine,
            "deadbeef",
            "/tmp/unused",
            requested,
            3,
            StoreConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_transfer_is_pending() {
        let transfer = transfer_over(StubEngine::with_info(100, 1000), 200);
        assert!(transfer.is_pending());
        assert_eq!(transfer.bytes_requested(), 200);
        assert_eq!(transfer.max_pieces(), 0);
        assert_eq!(transfer.ref_count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = ManagedTransfer::new(
            StubEngine::with_info(100, 1000),
            "deadbeef",
            "/tmp/unused",
            200,
            3,
            StoreConfig::new().bucket_count(0),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[test]
    fn test_quota_saturated() {
        let engine = StubEngine::with_info(100, 1000);
        let transfer = transfer_over(Arc::clone(&engine), 200);
        assert!(!transfer.quota_saturated());
        transfer.set_bytes_requested(1000);
        assert!(transfer.quota_saturated());
        transfer.set_bytes_requested(2000);
        assert!(transfer.quota_saturated());

        *engine.info.write() = None;
        assert!(!transfer.quota_saturated());
    }

    #[test]
    fn test_seed_needs_running_state() {
        let engine = StubEngine::with_info(100, 1000);
        engine.seeding.store(true, Ordering::Relaxed);
        let transfer = transfer_over(Arc::clone(&engine), 1000);

        // Pending: engine is done but the lifecycle never ran
        assert!(!transfer.seed());
        assert!(transfer.is_pending());

        transfer.pause();
        assert!(!transfer.seed());
        assert!(transfer.is_paused());
    }

    #[test]
    fn test_seed_without_metadata() {
        let engine = Arc::new(StubEngine::default());
        engine.seeding.store(true, Ordering::Relaxed);
        let transfer = transfer_over(engine, 1000);
        assert!(!transfer.seed());
    }

    #[test]
    fn test_pause_cancels_once() {
        let engine = StubEngine::with_info(100, 1000);
        let transfer = transfer_over(Arc::clone(&engine), 200);

        transfer.pause();
        transfer.pause();

        assert!(transfer.is_paused());
        assert_eq!(transfer.max_pieces(), 0);
        assert_eq!(*engine.cancels.lock(), vec![PieceRange::new(0, 100)]);
    }

    #[test]
    fn test_pause_without_metadata_skips_cancel() {
        let engine = Arc::new(StubEngine::default());
        let transfer = transfer_over(Arc::clone(&engine), 200);
        transfer.pause();
        assert!(transfer.is_paused());
        assert!(engine.cancels.lock().is_empty());
    }

    #[tokio::test]
    async fn test_request_more_without_metadata() {
        let transfer = transfer_over(Arc::new(StubEngine::default()), 200);
        let err = transfer.request_more().await.unwrap_err();
        assert!(matches!(err, StoreError::NotReady));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_request_more_while_pending() {
        let transfer = transfer_over(StubEngine::with_info(100, 1000), 200);
        let err = transfer.request_more().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidState {
                state: TransferState::Pending,
                ..
            }
        ));
    }

    #[test]
    fn test_ready_respects_deny_list() {
        let engine = StubEngine::with_info(100, 1000);
        engine.seeding.store(true, Ordering::Relaxed);
        let config = StoreConfig::new().deny("deadbeef");
        let handle = Arc::clone(&engine);
        let transfer = ManagedTransfer::new(handle, "deadbeef", "/tmp/unused", 1000, 3, config)
            .unwrap();
        assert!(!transfer.ready());
    }

    #[test]
    fn test_write_descriptor_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_info(100, 1000);
        let handle = Arc::clone(&engine);
        let transfer = ManagedTransfer::new(
            handle,
            "deadbeef",
            dir.path(),
            200,
            3,
            StoreConfig::default(),
        )
        .unwrap();

        transfer.write_descriptor().unwrap();
        transfer.write_descriptor().unwrap();

        assert_eq!(engine.descriptor_writes.load(Ordering::Relaxed), 1);
        let written = std::fs::read(dir.path().join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(written, b"d4:infod6:lengthi1024eee");
    }

    #[test]
    fn test_write_descriptor_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let transfer = ManagedTransfer::new(
            StubEngine::with_info(100, 1000),
            "deadbeef",
            &missing,
            200,
            3,
            StoreConfig::default(),
        )
        .unwrap();
        let err = transfer.write_descriptor().unwrap_err();
        assert!(matches!(err, StoreError::Descriptor { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_snapshot() {
        let engine = StubEngine::with_info(100, 1000);
        engine.completed.store(512, Ordering::Relaxed);
        let transfer = transfer_over(engine, 200);
        transfer.incr_ref();

        let status = transfer.status();
        assert_eq!(status.identity, "deadbeef");
        assert_eq!(status.state, TransferState::Pending);
        assert_eq!(status.bytes_requested, 200);
        assert_eq!(status.bytes_completed, 512);
        assert_eq!(status.total_length, Some(1000));
        assert_eq!(status.piece_count, Some(100));
        assert_eq!(status.ref_count, 1);
    }

    #[test]
    fn test_ref_counting() {
        let transfer = transfer_over(Arc::new(StubEngine::default()), 0);
        transfer.incr_ref();
        transfer.incr_ref();
        transfer.decr_ref();
        assert_eq!(transfer.ref_count(), 1);
        transfer.decr_ref();
        transfer.decr_ref();
        assert_eq!(transfer.ref_count(), -1);
    }
}

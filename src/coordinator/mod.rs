// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication engine coordinator.
//!
//! Owns the two stores and the [`ReplicationScheme`], and drives it either
//! once (single-run mode) or from a periodic [`scheduler`] task until
//! shutdown.
//!
//! # Example
//!
//! ```rust,no_run
//! use block_replicate::{FilesystemStore, ReplicationConfig, ReplicationEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> block_replicate::Result<()> {
//! let from = Arc::new(FilesystemStore::new("/data/origin").await.map_err(|e| {
//!     block_replicate::ReplicationError::store("open origin bucket", "/data/origin", e)
//! })?);
//! let to = Arc::new(FilesystemStore::new("/data/target").await.map_err(|e| {
//!     block_replicate::ReplicationError::store("open target bucket", "/data/target", e)
//! })?);
//!
//! let mut engine = ReplicationEngine::new(ReplicationConfig::default(), from, to)?;
//! engine.start().await?;
//! // ... until the process is asked to stop
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod scheduler;
mod types;

pub use types::EngineState;

use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::scheme::{ReplicationScheme, RunStats};
use crate::store::SharedStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The main replication engine.
///
/// Copies eligible blocks from the origin store to the target store. The
/// origin is only ever read. The target is existence-checked, its
/// descriptors read, and written to.
pub struct ReplicationEngine {
    /// Configuration
    config: ReplicationConfig,

    /// Run logic, shared with the loop task
    scheme: Arc<ReplicationScheme>,

    /// Engine state (broadcast to watchers)
    state_tx: watch::Sender<EngineState>,

    /// Engine state receiver (for internal use)
    state_rx: watch::Receiver<EngineState>,

    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,

    /// Shutdown signal receiver
    shutdown_rx: watch::Receiver<bool>,

    /// Run loop task handle
    loop_handle: Option<JoinHandle<()>>,
}

impl ReplicationEngine {
    /// Create a new replication engine.
    ///
    /// Validates the configuration. The engine starts in `Created` state;
    /// call [`start()`](Self::start) to begin replication.
    pub fn new(config: ReplicationConfig, from: SharedStore, to: SharedStore) -> Result<Self> {
        config.validate()?;
        let filter = config.filter.block_filter()?;

        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            scheme: Arc::new(ReplicationScheme::new(from, to, filter)),
            state_tx,
            state_rx,
            shutdown_tx,
            shutdown_rx,
            loop_handle: None,
        })
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn scheme(&self) -> &ReplicationScheme {
        &self.scheme
    }

    /// Get current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if the run loop is active.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    fn set_state(&self, state: EngineState) {
        let _ = self.state_tx.send(state);
        metrics::set_engine_state(&state.to_string());
    }

    /// Start the replication engine.
    ///
    /// In single-run mode, performs exactly one run before returning and
    /// yields its stats (`Some`); the engine ends `Stopped` on success and
    /// `Failed` on error. Otherwise spawns the run loop and returns `None`
    /// right away.
    pub async fn start(&mut self) -> Result<Option<RunStats>> {
        if self.state() != EngineState::Created {
            return Err(ReplicationError::InvalidState {
                expected: "Created".to_string(),
                actual: self.state().to_string(),
            });
        }

        let filter = self.scheme.filter();
        info!(
            selector = %filter.selector(),
            resolution = filter.resolution(),
            compaction_level = filter.compaction_level(),
            single_run = self.config.schedule.single_run,
            "Starting replication engine"
        );

        if self.config.schedule.single_run {
            return match self.run_once().await {
                Ok(stats) => {
                    self.set_state(EngineState::Stopped);
                    Ok(Some(stats))
                }
                Err(e) => {
                    self.set_state(EngineState::Failed);
                    Err(e)
                }
            };
        }

        let scheme = Arc::clone(&self.scheme);
        let interval = self.config.schedule.interval_duration();
        let shutdown_rx = self.shutdown_rx.clone();
        self.loop_handle = Some(tokio::spawn(scheduler::run_loop(scheme, interval, shutdown_rx)));
        debug!("Spawned replication loop task");

        self.set_state(EngineState::Running);
        info!("Replication engine running");
        Ok(None)
    }

    /// Execute one run now, independent of the loop.
    ///
    /// Callers must not overlap this with a running loop against the
    /// same target.
    pub async fn run_once(&self) -> Result<RunStats> {
        scheduler::run_once(&self.scheme, &self.shutdown_rx).await
    }

    /// Shutdown the replication engine gracefully.
    ///
    /// Signals the loop, which cancels the in-flight run at its next store
    /// call, and waits up to `schedule.shutdown_timeout` for it to finish.
    pub async fn shutdown(&mut self) {
        info!("Shutting down replication engine");
        self.set_state(EngineState::ShuttingDown);

        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.loop_handle.take() {
            let timeout = self.config.schedule.shutdown_timeout_duration();
            let abort = handle.abort_handle();
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => debug!("Replication loop completed gracefully"),
                Ok(Err(e)) => warn!(error = %e, "Replication loop panicked during shutdown"),
                Err(_) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "Replication loop timed out during shutdown, aborting");
                    abort.abort();
                }
            }
        }

        self.set_state(EngineState::Stopped);
        info!("Replication engine stopped");
    }
}

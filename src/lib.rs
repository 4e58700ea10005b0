//! # Block Replicate
//!
//! Replicates immutable time-series blocks from one object store to another,
//! byte for byte, oldest first.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                            block-replicate                                │
//! │                                                                           │
//! │  ┌───────────┐   ┌──────────────────────────────────────────────────────┐ │
//! │  │ Scheduler │──►│ ReplicationScheme::execute()                         │ │
//! │  │ (interval)│   │  list origin ─► load meta ─► filter ─► sort min_time │ │
//! │  └───────────┘   └───────────────────────────┬──────────────────────────┘ │
//! │                                              ▼                            │
//! │                  ┌──────────────────────────────────────────────────────┐ │
//! │                  │ Replicator (per block, sequential)                   │ │
//! │                  │  meta equal? ─► chunks/* ─► index ─► meta.json last  │ │
//! │                  └──────────────────────────────────────────────────────┘ │
//! └───────────────────────────────────────────────────────────────────────────┘
//!        ▲ read only                                      │ exists/get/upload
//!   ┌─────────┐                                      ┌─────────┐
//!   │ origin  │                                      │ target  │
//!   └─────────┘                                      └─────────┘
//! ```
//!
//! ## Guarantees
//!
//! 1. **Descriptor last**: a block's `meta.json` only reaches the target after
//!    all of its chunks and its index. A descriptor in the target proves the
//!    block is complete.
//! 2. **Oldest first**: eligible blocks are copied in ascending `min_time`,
//!    one at a time, so a compactor on the target never sees a gap.
//! 3. **Idempotent**: a block whose target descriptor matches the origin
//!    byte for byte is skipped; an object already in the target is never
//!    copied again.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use block_replicate::{InMemoryStore, ReplicationConfig, ReplicationEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let from = Arc::new(InMemoryStore::new("origin"));
//!     let to = Arc::new(InMemoryStore::new("target"));
//!
//!     let mut engine = ReplicationEngine::new(ReplicationConfig::default(), from, to)
//!         .expect("valid config");
//!     engine.start().await.expect("Failed to start");
//!
//!     // Engine runs until shutdown signal
//!     engine.shutdown().await;
//! }
//! ```

pub mod block;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod meta;
pub mod metrics;
pub mod replicator;
pub mod scheme;
pub mod store;

// Re-exports for convenience
pub use block::{is_block_dir, BlockId, BlockMeta, ResolutionLevel};
pub use config::{FilterConfig, ReplicationConfig, ScheduleConfig};
pub use coordinator::{EngineState, ReplicationEngine};
pub use error::{ReplicationError, Result};
pub use filter::{BlockFilter, LabelMatcher, LabelSelector};
pub use meta::{load_meta, MetaLoad};
pub use replicator::{BlockOutcome, Replicator};
pub use scheme::{ReplicationScheme, RunStats};
pub use store::{FilesystemStore, InMemoryStore, ObjectStore, SharedStore, StoreError};

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the replication engine.
//!
//! Configuration is passed to [`ReplicationEngine::new()`](crate::ReplicationEngine::new)
//! and can be constructed programmatically or deserialized from YAML/JSON.
//! Reading files and command-line flags is left to the embedding binary.
//!
//! # Quick Start
//!
//! ```rust
//! use block_replicate::config::{FilterConfig, ReplicationConfig};
//!
//! let config = ReplicationConfig {
//!     filter: FilterConfig {
//!         matchers: vec![r#"cluster="eu-1""#.into()],
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicationConfig
//! ├── filter: FilterConfig
//! │   ├── matchers: Vec<String>     # key="value" label matchers (AND)
//! │   ├── resolution: i64           # downsampling resolution in ms (0 = raw)
//! │   └── compaction_level: i32     # 0 = not yet compacted
//! └── schedule: ScheduleConfig
//!     ├── interval: String          # pause between runs ("1m")
//!     ├── single_run: bool          # run once and stop
//!     └── shutdown_timeout: String  # wait for in-flight run ("10s")
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! filter:
//!   matchers:
//!     - 'cluster="eu-1"'
//!   resolution: 0
//!   compaction_level: 0
//!
//! schedule:
//!   interval: "1m"
//!   single_run: false
//! ```

use crate::error::{ReplicationError, Result};
use crate::filter::{BlockFilter, LabelSelector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config: passed to ReplicationEngine::new()
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `ReplicationEngine::new()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Which blocks qualify.
    #[serde(default)]
    pub filter: FilterConfig,

    /// When runs happen.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl ReplicationConfig {
    /// Create a config for tests: one run, every block, short timeouts.
    pub fn for_testing() -> Self {
        Self {
            filter: FilterConfig::default(),
            schedule: ScheduleConfig {
                interval: "100ms".to_string(),
                single_run: true,
                shutdown_timeout: "1s".to_string(),
            },
        }
    }

    /// Check the config can drive an engine.
    pub fn validate(&self) -> Result<()> {
        self.filter.block_filter()?;
        if self.schedule.interval_duration().is_zero() {
            return Err(ReplicationError::Config(
                "schedule.interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FilterConfig: block eligibility
// ═══════════════════════════════════════════════════════════════════════════════

/// Block eligibility settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Label matchers in `key="value"` form. All must match.
    /// Empty replicates blocks with any labels.
    #[serde(default)]
    pub matchers: Vec<String>,

    /// Only blocks with this downsampling resolution (milliseconds).
    #[serde(default)]
    pub resolution: i64,

    /// Only blocks at this compaction level.
    #[serde(default)]
    pub compaction_level: i32,
}

impl FilterConfig {
    /// Build the predicate, parsing the matchers.
    pub fn block_filter(&self) -> Result<BlockFilter> {
        let selector = LabelSelector::parse(&self.matchers)?;
        Ok(BlockFilter::new(selector, self.resolution, self.compaction_level))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ScheduleConfig: run loop
// ═══════════════════════════════════════════════════════════════════════════════

/// Run loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Time between the starts of consecutive runs (humantime).
    /// A run that overruns delays the next one; runs never overlap.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Run exactly once, then stop.
    #[serde(default)]
    pub single_run: bool,

    /// How long `shutdown()` waits for an in-flight run (humantime).
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: String,
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_shutdown_timeout() -> String {
    "10s".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            single_run: false,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the interval string to a Duration.
    pub fn interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.interval).unwrap_or(Duration::from_secs(60))
    }

    /// Parse the shutdown timeout string to a Duration.
    pub fn shutdown_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.shutdown_timeout).unwrap_or(Duration::from_secs(10))
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Origin bucket scanning (iterations, meta loads, partial blocks)
//! - Block and object copies
//! - Run outcomes and durations
//! - Engine lifecycle state
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replicate_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration)
//!
//! Installing an exporter is up to the embedding process. Without one,
//! every call here is a no-op.
//!
//! # Usage
//!
//! ```rust,no_run
//! use block_replicate::metrics;
//! use std::time::Duration;
//!
//! metrics::record_object_replicated();
//! metrics::record_run(true, Duration::from_millis(1500));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// =============================================================================
// Origin Scan Metrics
// =============================================================================

/// One entry visited while listing the origin bucket root.
pub fn record_origin_iteration() {
    counter!("replicate_origin_iterations_total").increment(1);
}

/// One descriptor load attempted from the origin bucket.
pub fn record_origin_meta_load() {
    counter!("replicate_origin_meta_loads_total").increment(1);
}

/// A block skipped because its descriptor is missing or unparseable.
pub fn record_origin_partial_meta() {
    counter!("replicate_origin_partial_meta_reads_total").increment(1);
}

// =============================================================================
// Copy Metrics
// =============================================================================

pub fn record_block_already_replicated() {
    counter!("replicate_blocks_already_replicated_total").increment(1);
}

pub fn record_block_replicated() {
    counter!("replicate_blocks_replicated_total").increment(1);
}

pub fn record_object_replicated() {
    counter!("replicate_objects_replicated_total").increment(1);
}

// =============================================================================
// Run Metrics
// =============================================================================

/// Record the outcome and duration of one replication run.
pub fn record_run(success: bool, duration: Duration) {
    let result = if success { "success" } else { "error" };
    counter!("replicate_replication_runs_total", "result" => result).increment(1);
    histogram!("replicate_replication_run_duration_seconds", "result" => result)
        .record(duration.as_secs_f64());
}

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    // Numeric encoding for alerting
    let value = match state {
        "Created" => 0.0,
        "Running" => 1.0,
        "ShuttingDown" => 2.0,
        "Stopped" => 3.0,
        "Failed" => 4.0,
        _ => -1.0,
    };
    gauge!("replicate_engine_state").set(value);
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scheduler: periodic replication runs.
//!
//! A single task ticks on a fixed interval and executes one run per tick.
//! Runs never overlap: the next tick is awaited only after the previous
//! run returned, and ticks missed during a long run are delayed rather
//! than bursted.
//!
//! A failed run is logged and counted, then the loop waits for the next
//! tick. Store outages are expected to heal on their own. Only the
//! shutdown signal ends the loop.

use crate::block::BlockId;
use crate::error::Result;
use crate::metrics;
use crate::scheme::{ReplicationScheme, RunStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, Instrument};

/// Run replication every `interval` until shutdown is signaled.
///
/// The first run starts immediately.
pub async fn run_loop(
    scheme: Arc<ReplicationScheme>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let span = tracing::info_span!("scheduler");

    async move {
        // Mark initial shutdown value as seen so changed() only fires on actual changes
        let _ = shutdown_rx.borrow_and_update();

        info!(interval_ms = interval.as_millis() as u64, "Starting replication loop");

        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping replication loop");
                        break;
                    }
                    continue;
                }

                _ = timer.tick() => {}
            }

            if let Err(e) = run_once(&scheme, &shutdown_rx).await {
                if e.is_shutdown() {
                    break;
                }
            }
        }

        info!("Replication loop stopped");
    }
    .instrument(span)
    .await
}

/// One run with a fresh run id, logged and recorded in the run metrics.
pub async fn run_once(
    scheme: &ReplicationScheme,
    shutdown_rx: &watch::Receiver<bool>,
) -> Result<RunStats> {
    let run_id = BlockId::generate();
    let span = tracing::info_span!("replication_run", run_id = %run_id);

    async {
        info!("Running replication attempt");
        let start = Instant::now();
        let result = scheme.execute(shutdown_rx).await;
        let elapsed = start.elapsed();
        if let Some(success) = run_metric_result(&result) {
            metrics::record_run(success, elapsed);
        }

        match &result {
            Ok(stats) => {
                info!(
                    candidates = stats.candidates,
                    blocks_replicated = stats.blocks_replicated,
                    already_replicated = stats.already_replicated,
                    objects_replicated = stats.objects_replicated,
                    partial = stats.partial_meta,
                    duration_ms = elapsed.as_millis() as u64,
                    "Ran replication successfully"
                );
            }
            Err(e) if e.is_shutdown() => {
                debug!("Replication run cancelled by shutdown");
            }
            Err(e) => {
                error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Replication run failed"
                );
            }
        }

        result
    }
    .instrument(span)
    .await
}

/// Outcome label for the run metrics. Runs cancelled by shutdown are not
/// counted.
fn run_metric_result(result: &Result<RunStats>) -> Option<bool> {
    match result {
        Ok(_) => Some(true),
        Err(e) if e.is_shutdown() => None,
        Err(_) => Some(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplicationError;
    use crate::filter::BlockFilter;
    use crate::store::InMemoryStore;

    fn scheme() -> Arc<ReplicationScheme> {
        Arc::new(ReplicationScheme::new(
            Arc::new(InMemoryStore::new("from")),
            Arc::new(InMemoryStore::new("to")),
            BlockFilter::default(),
        ))
    }

    #[tokio::test]
    async fn test_run_once_empty() {
        let (_tx, rx) = watch::channel(false);
        let stats = run_once(&scheme(), &rx).await.unwrap();
        assert_eq!(stats, RunStats::default());
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(scheme(), Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(scheme(), Duration::from_secs(3600), rx));
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }

    #[test]
    fn test_shutdown_is_not_a_counted_run() {
        assert_eq!(run_metric_result(&Ok(RunStats::default())), Some(true));
        assert_eq!(run_metric_result(&Err(ReplicationError::Shutdown)), None);

        let wrapped = ReplicationError::BlockReplication {
            block: "01ABC".to_string(),
            source: Box::new(ReplicationError::Shutdown),
        };
        assert_eq!(run_metric_result(&Err(wrapped)), None);

        let failed = ReplicationError::Config("bad".to_string());
        assert_eq!(run_metric_result(&Err(failed)), Some(false));
    }
}

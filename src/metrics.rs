// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for task-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding service is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `task_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome of one fully-processed mutation
/// (status: success, dead_lettered)
pub fn record_mutation(status: &str) {
    counter!(
        "task_sync_mutations_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a single upsert attempt against the index
/// (status: success, error)
pub fn record_upsert_attempt(status: &str) {
    counter!(
        "task_sync_upsert_attempts_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record end-to-end latency of a mutation, retries included
pub fn record_mutation_latency(duration: Duration) {
    histogram!("task_sync_mutation_seconds").record(duration.as_secs_f64());
}

/// Record a dead-letter append failure. These are silent data loss of the
/// sync signal; alert on this counter.
pub fn record_dead_letter_append_failure() {
    counter!("task_sync_dead_letter_append_failures_total").increment(1);
}

/// Record entries re-enqueued by a replay scan
pub fn record_replayed(count: usize) {
    counter!("task_sync_replayed_total").increment(count as u64);
}

/// Record a replay tick skipped because a scan was still in progress
pub fn record_replay_skipped() {
    counter!("task_sync_replay_skipped_ticks_total").increment(1);
}

/// Record replay scan latency
pub fn record_replay_scan_latency(duration: Duration) {
    histogram!("task_sync_replay_scan_seconds").record(duration.as_secs_f64());
}

/// Record a dead-letter entry whose payload failed to deserialize
/// (action: retained, discarded)
pub fn record_poison_entry(action: &str) {
    counter!(
        "task_sync_poison_entries_total",
        "action" => action.to_string()
    )
    .increment(1);
}

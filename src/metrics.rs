// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Task outcomes by type
//! - Apply latency on the local engine
//! - History resends (gap fills)
//! - Domain filter decisions
//! - Processor attempts and failures
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replication_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Histograms track distributions (duration, attempts)
//!
//! # Usage
//!
//! ```rust,no_run
//! use history_replication::metrics;
//! use std::time::Duration;
//!
//! metrics::record_task("history", "applied");
//! metrics::record_apply_latency("history", Duration::from_millis(12));
//! ```

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome of one `execute` call.
///
/// `outcome` is one of `applied`, `filtered`, `skipped`, `retry`, `error`.
pub fn record_task(task_type: &str, outcome: &str) {
    counter!(
        "replication_tasks_total",
        "task_type" => task_type.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record how long the engine apply call took.
pub fn record_apply_latency(task_type: &str, duration: Duration) {
    histogram!("replication_task_apply_duration_seconds", "task_type" => task_type.to_string())
        .record(duration.as_secs_f64());
}

/// Record a history resend attempt.
///
/// `trigger` is the task type whose apply hit the gap.
pub fn record_resend(generation: &str, trigger: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "replication_resend_total",
        "generation" => generation.to_string(),
        "trigger" => trigger.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record resend latency.
pub fn record_resend_latency(generation: &str, duration: Duration) {
    histogram!("replication_resend_duration_seconds", "generation" => generation.to_string())
        .record(duration.as_secs_f64());
}

/// Record a domain filter decision.
pub fn record_domain_filter(result: &str) {
    counter!("replication_domain_filter_total", "result" => result.to_string()).increment(1);
}

/// Record how many `execute` calls the processor needed for one task.
pub fn record_task_attempts(attempts: usize) {
    histogram!("replication_task_attempts").record(attempts as f64);
}

/// Record a task the processor gave up on.
pub fn record_task_failure(error_type: &str) {
    counter!("replication_task_failures_total", "error_type" => error_type.to_string())
        .increment(1);
}

//! Metrics recording for the `SQLite` document store.

use std::time::Instant;

/// Records a counter and a latency histogram for a store operation.
///
/// # Arguments
///
/// * `operation` - Operation name (`list` or `commit`)
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - `success` or `error`
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "document_store_operations_total",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "document_store_operation_duration_ms",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a result to the status label used by [`record_operation_metrics`].
pub const fn status_of<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

//! Progress reporting for long-running snapshot operations.
//!
//! Every long-running step writes to a [`ProgressReporter`] owned by the
//! caller. Reporters are sinks: they render or record what they are given
//! and never influence the operation.

use std::sync::Mutex;

/// Sink for percentage and status-line updates.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct StatusBar;
///
/// impl ProgressReporter for StatusBar {
///     fn report(&self, percent: u8, message: &str) {
///         eprint!("\r[{percent:>3}%] {message}");
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Reports progress. `percent` is in `0..=100`.
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressReporter for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message);
    }
}

/// Reporter that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Reporter that keeps only the most recent update.
#[derive(Debug, Default)]
pub struct LastProgress {
    last: Mutex<Option<(u8, String)>>,
}

impl LastProgress {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last reported `(percent, message)`.
    #[must_use]
    pub fn last(&self) -> Option<(u8, String)> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ProgressReporter for LastProgress {
    fn report(&self, percent: u8, message: &str) {
        if let Ok(mut guard) = self.last.lock() {
            *guard = Some((percent, message.to_string()));
        }
    }
}

/// Reporter that emits each update as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, percent: u8, message: &str) {
        tracing::info!(percent, "{message}");
    }
}

/// Integer percentage of `done` over `total`, clamped to `0..=100`.
///
/// An empty total counts as complete.
#[must_use]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = done.min(total).saturating_mul(100) / total;
    u8::try_from(value).unwrap_or(100)
}

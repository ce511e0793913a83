//! Progress reporting for ingestion runs.
//!
//! The pipeline reports how many feed rows it has handled through
//! [`ProgressCallback`] without knowing how (or whether) that progress is
//! rendered. The CLI plugs in an `indicatif` bar; the server and tests use
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running operation.
///
/// Implementations must be `Send + Sync` so a single callback can be
/// shared across tasks behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Updates the message displayed alongside the indicator.
    fn set_message(&self, msg: String);

    /// Marks progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

//! Progress reporting
//!
//! Sinks are called from the single worker and must return quickly.

/// Receives progress of an archive or retrieval run
pub trait ProgressSink: Send + Sync {
    fn initialize(&self, total_bytes: u64, total_items: u64);

    /// Cumulative bytes processed so far
    fn bytes_progress(&self, processed_bytes: u64);

    /// Cumulative items processed so far
    fn item_progress(&self, processed_items: u64);

    fn finished(&self);

    /// At least one item failed
    fn error(&self);

    /// Totals are not known yet
    fn indeterminate(&self);
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn initialize(&self, _total_bytes: u64, _total_items: u64) {}
    fn bytes_progress(&self, _processed_bytes: u64) {}
    fn item_progress(&self, _processed_items: u64) {}
    fn finished(&self) {}
    fn error(&self) {}
    fn indeterminate(&self) {}
}

/// Logs progress through `tracing` at debug level
#[derive(Debug, Default)]
pub struct LogProgress {
    totals: std::sync::Mutex<(u64, u64)>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn totals(&self) -> (u64, u64) {
        self.totals.lock().map(|t| *t).unwrap_or((0, 0))
    }
}

impl ProgressSink for LogProgress {
    fn initialize(&self, total_bytes: u64, total_items: u64) {
        if let Ok(mut totals) = self.totals.lock() {
            *totals = (total_bytes, total_items);
        }
        tracing::info!(total_bytes, total_items, "Starting");
    }

    fn bytes_progress(&self, processed_bytes: u64) {
        let (total_bytes, _) = self.totals();
        tracing::debug!(processed_bytes, total_bytes, "Bytes processed");
    }

    fn item_progress(&self, processed_items: u64) {
        let (_, total_items) = self.totals();
        tracing::debug!(processed_items, total_items, "Items processed");
    }

    fn finished(&self) {
        tracing::debug!("Finished");
    }

    fn error(&self) {}

    fn indeterminate(&self) {
        tracing::debug!("Collecting items");
    }
}

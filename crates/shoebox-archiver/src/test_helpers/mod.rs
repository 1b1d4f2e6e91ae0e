//! Test doubles for archiver tests
//!
//! `MemoryBlobStore` keeps blobs in memory and records uploads, snapshots
//! and deletes. `MemoryFileSource` stands in for the local directory,
//! `StubThumbnails` skips image decoding and `RecordingProgress` records
//! every progress call.

mod memory_files;
mod memory_store;

pub use memory_files::MemoryFileSource;
pub use memory_store::{MemoryBlob, MemoryBlobStore};

use async_trait::async_trait;
use bytes::Bytes;
use shoebox_processing::{FormatError, FormatResult, ThumbnailGenerator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::progress::ProgressSink;

/// Thumbnail generator returning fixed bytes without decoding the input
#[derive(Debug, Clone, Default)]
pub struct StubThumbnails {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StubThumbnails {
    pub const OUTPUT: &'static [u8] = b"thumbnail";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailGenerator for StubThumbnails {
    async fn generate(&self, _image: Bytes, _max_width: u32, _max_height: u32) -> FormatResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FormatError::Image("not an image".to_string()));
        }
        Ok(Bytes::from_static(Self::OUTPUT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Initialize { total_bytes: u64, total_items: u64 },
    Bytes(u64),
    Items(u64),
    Finished,
    Error,
    Indeterminate,
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
    cancel_after: Option<(u64, CancellationToken)>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels `token` once `items` items have been reported
    pub fn cancelling_after(items: u64, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((items, token)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Last reported item count
    pub fn items(&self) -> Option<u64> {
        self.events().iter().rev().find_map(|e| match e {
            ProgressEvent::Items(n) => Some(*n),
            _ => None,
        })
    }

    /// Last reported byte count
    pub fn bytes(&self) -> Option<u64> {
        self.events().iter().rev().find_map(|e| match e {
            ProgressEvent::Bytes(n) => Some(*n),
            _ => None,
        })
    }

    fn push(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressSink for RecordingProgress {
    fn initialize(&self, total_bytes: u64, total_items: u64) {
        self.push(ProgressEvent::Initialize {
            total_bytes,
            total_items,
        });
    }

    fn bytes_progress(&self, processed_bytes: u64) {
        self.push(ProgressEvent::Bytes(processed_bytes));
    }

    fn item_progress(&self, processed_items: u64) {
        self.push(ProgressEvent::Items(processed_items));
        if let Some((items, token)) = &self.cancel_after {
            if processed_items >= *items {
                token.cancel();
            }
        }
    }

    fn finished(&self) {
        self.push(ProgressEvent::Finished);
    }

    fn error(&self) {
        self.push(ProgressEvent::Error);
    }

    fn indeterminate(&self) {
        self.push(ProgressEvent::Indeterminate);
    }
}

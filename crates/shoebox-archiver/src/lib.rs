//! Shoebox Archiver
//!
//! Archives a directory of photos and videos into a blob store, one date
//! directory per capture day, and retrieves them again.
//!
//! - `ArchivePipeline` drives an upload run over the files of a `FileSource`.
//! - `UploadReconciler` decides, per file, between uploading, reporting an
//!   existing match and applying the conflict policy.
//! - `Retriever` downloads a date range, requests rehydration of archived
//!   blobs and resumes saved retrieval sessions.
//!
//! All work happens sequentially on the calling task; cancellation is
//! checked between files.

pub mod costs;
pub mod date_resolver;
pub mod dedup;
pub mod files;
pub mod pipeline;
pub mod progress;
pub mod reconciler;
pub mod report;
pub mod retrieval;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use costs::{CostEstimator, UsageSnapshot};
pub use date_resolver::{DateResolver, PeerFiles};
pub use dedup::DeduplicationIndex;
pub use files::{CandidateFile, FileEntry, FileSource, LocalFileSource, SearchPattern};
pub use pipeline::ArchivePipeline;
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use reconciler::{Reconciled, RemoteState, UploadReconciler};
pub use report::{ArchiveReport, BlobResult, FileResult, RetrieveReport};
pub use retrieval::{matches_filters, RetrieveOptions, Retriever, SessionStore};

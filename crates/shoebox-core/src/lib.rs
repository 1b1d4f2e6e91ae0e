//! Shoebox Core Library
//!
//! This crate provides core domain models, error types and configuration
//! that are shared across all Shoebox components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{ArchiverConfig, CostPrices, FaceConfig, ThumbnailConfig, VisionConfig};
pub use error::{ArchiveError, ArchiveResult, ErrorMetadata, LogLevel};
pub use models::{
    AccessTier, ConflictResolution, ContentHash, DestinationKey, DownloadOptions,
    DownloadOutcome, PendingItem, RetrievalSession, UploadMetadata, UploadOptions,
    UploadOutcome,
};
pub use storage_types::StorageBackend;
// Note: BlobStore, StorageError, StorageResult live in shoebox-storage

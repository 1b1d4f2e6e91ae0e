//! Shoebox Storage Library
//!
//! This crate provides the blob store abstraction the archiver runs against,
//! with implementations for the local filesystem and S3-compatible stores.
//!
//! # Blob layout
//!
//! Blobs are addressed by container and blob name. Archived files are named
//! `{date directory}/{file name}` (for example `2019/05/25/IMG_1.jpg`), and a
//! blob's identifier outside the store is `{container}/{blob name}`.
//!
//! Blob names must not contain `..` segments or a leading `/`. Validation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
pub use keys::BlobKey;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use shoebox_core::StorageBackend;
pub use traits::{
    BlobItem, BlobProperties, BlobStore, BlobStream, StorageError, StorageResult, UploadProgress,
    UploadRequest,
};

//! Domain models shared by the archiver, storage backends and the CLI.

pub mod conflict;
pub mod hash;
pub mod key;
pub mod metadata;
pub mod options;
pub mod outcome;
pub mod session;
pub mod tier;

pub use conflict::ConflictResolution;
pub use hash::ContentHash;
pub use key::DestinationKey;
pub use metadata::{metadata_keys, UploadMetadata};
pub use options::{DownloadOptions, UploadOptions};
pub use outcome::{DownloadOutcome, UploadOutcome};
pub use session::{PendingItem, RetrievalSession};
pub use tier::AccessTier;

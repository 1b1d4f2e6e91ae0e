//! Content-addressed deduplication index
//!
//! Keeps, per destination directory, the set of content hashes already
//! stored there. A directory is listed from the blob store the first time it
//! is queried and then only updated in memory for the rest of the run.
//!
//! The index is owned by a single worker. Callers that process files
//! concurrently must serialise access per directory, since `contains` followed
//! by `add` is not atomic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use shoebox_core::{ArchiveResult, ContentHash};
use shoebox_storage::keys::directory_prefix;
use shoebox_storage::BlobStore;

use crate::costs::CostEstimator;

pub struct DeduplicationIndex {
    store: Arc<dyn BlobStore>,
    costs: Arc<CostEstimator>,
    sets: HashMap<(String, String), HashSet<ContentHash>>,
}

impl DeduplicationIndex {
    pub fn new(store: Arc<dyn BlobStore>, costs: Arc<CostEstimator>) -> Self {
        Self {
            store,
            costs,
            sets: HashMap::new(),
        }
    }

    /// Whether a blob with this exact content is already stored under `directory`.
    ///
    /// The first call for a directory lists every blob under it.
    pub async fn contains(
        &mut self,
        container: &str,
        directory: &str,
        hash: &ContentHash,
    ) -> ArchiveResult<bool> {
        let key = (container.to_string(), directory_prefix(directory));
        if !self.sets.contains_key(&key) {
            let hashes = self.load(&key.0, &key.1).await?;
            self.sets.insert(key.clone(), hashes);
        }
        Ok(self.sets.get(&key).is_some_and(|set| set.contains(hash)))
    }

    /// Record a hash stored under `directory`.
    ///
    /// Adding to a directory that `contains` never loaded starts an empty set
    /// for it, so a later `contains` will not list it from the store.
    pub fn add(&mut self, container: &str, directory: &str, hash: ContentHash) {
        let key = (container.to_string(), directory_prefix(directory));
        let set = self.sets.entry(key).or_insert_with_key(|(container, prefix)| {
            tracing::warn!(
                container = %container,
                prefix = %prefix,
                "Deduplication set was not loaded before adding to it"
            );
            HashSet::new()
        });
        set.insert(hash);
    }

    /// Number of directories loaded so far
    pub fn loaded_directories(&self) -> usize {
        self.sets.len()
    }

    async fn load(&self, container: &str, prefix: &str) -> ArchiveResult<HashSet<ContentHash>> {
        tracing::info!("Gathering hashes from '{}/{}'", container, prefix);
        self.costs.add_list_or_create_container();

        let mut stream = self.store.list_blobs(container, prefix, false).await?;
        let mut hashes = HashSet::new();
        while let Some(item) = stream.next().await {
            if let Some(hash) = item?.properties.content_hash {
                hashes.insert(hash);
            }
        }

        tracing::debug!(
            container = %container,
            prefix = %prefix,
            count = hashes.len(),
            "Deduplication set loaded"
        );
        Ok(hashes)
    }
}

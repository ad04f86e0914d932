use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{Item, PipelineError, Result};

/// Default per-partition record cap.
pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Content-addressed article store. One JSON file per partition ("all" plus
/// one per topic), each an ordered sequence of items deduplicated by
/// fingerprint with first-seen-wins semantics.
///
/// Corruption policy: a partition file that exists but cannot be parsed fails
/// the merge with `CorruptPartition` naming the partition. Treating it as
/// empty would silently re-admit previously excluded or evicted items.
pub struct ArticleStore {
    data_dir: PathBuf,
    max_records: usize,
    // Merges into one partition are single-writer; distinct partitions may
    // merge concurrently.
    partition_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArticleStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_records: DEFAULT_MAX_RECORDS,
            partition_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    fn partition_path(&self, partition: &str) -> PathBuf {
        self.data_dir.join(format!("{}_articles.json", partition))
    }

    async fn lock_for(&self, partition: &str) -> Arc<Mutex<()>> {
        let mut locks = self.partition_locks.lock().await;
        locks
            .entry(partition.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Merge `new_items` into a partition and persist the result atomically.
    /// Returns how many records were newly added. Items whose fingerprint is
    /// already stored are ignored: the first-stored version is authoritative,
    /// a later fetch never overwrites it.
    pub async fn merge(&self, partition: &str, new_items: &[Item]) -> Result<usize> {
        let lock = self.lock_for(partition).await;
        let _guard = lock.lock().await;

        let mut records = self.load_unlocked(partition)?;
        let mut seen: HashSet<String> =
            records.iter().map(|i| i.fingerprint.clone()).collect();

        let before = records.len();
        for item in new_items {
            if seen.insert(item.fingerprint.clone()) {
                records.push(item.clone());
            }
        }
        let added = records.len() - before;

        // Cap by evicting the oldest records in insertion order, not by
        // published date.
        if records.len() > self.max_records {
            let excess = records.len() - self.max_records;
            records.drain(..excess);
            debug!(partition, evicted = excess, "partition cap applied");
        }

        self.persist(partition, &records)?;
        info!(partition, added, total = records.len(), "merged partition");
        Ok(added)
    }

    /// Read a partition's records. An absent file is genuinely empty state;
    /// an unreadable file is corruption and surfaces as an error.
    pub async fn load(&self, partition: &str) -> Result<Vec<Item>> {
        let lock = self.lock_for(partition).await;
        let _guard = lock.lock().await;
        self.load_unlocked(partition)
    }

    fn load_unlocked(&self, partition: &str) -> Result<Vec<Item>> {
        let path = self.partition_path(partition);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::CorruptPartition {
                partition: partition.to_string(),
                reason: format!("unreadable file {}: {}", path.display(), e),
            }
        })?;
        serde_json::from_str(&content).map_err(|e| PipelineError::CorruptPartition {
            partition: partition.to_string(),
            reason: format!("invalid JSON in {}: {}", path.display(), e),
        })
    }

    /// Write-complete-then-replace: serialize to a temp file in the same
    /// directory, then atomically rename over the partition file, so a crash
    /// mid-write can never leave a truncated store.
    fn persist(&self, partition: &str, records: &[Item]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.partition_path(partition);
        let tmp = self.data_dir.join(format!(".{}_articles.json.tmp", partition));

        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Seed a partition file directly, bypassing merge. Test helper.
#[doc(hidden)]
pub fn write_partition_raw(data_dir: &Path, partition: &str, content: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(
        data_dir.join(format!("{}_articles.json", partition)),
        content,
    )
}

//! File-backed record store.
//!
//! Layout under the root directory:
//!
//! ```text
//! root/
//!   .lock
//!   boards/<id>.json
//!   lists/<id>.json
//!   tasks/<id>.json
//! ```

use super::{sort_records, EntityKind, NewRecord, Record, RecordKey, RecordPatch, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Board, List, Task};
use async_trait::async_trait;
use fs2::FileExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

const KINDS: [EntityKind; 3] = [EntityKind::Board, EntityKind::List, EntityKind::Task];

/// One JSON file per record
#[derive(Debug)]
pub struct FileRecordStore {
    root: PathBuf,
    /// Serializes mutations from this process; the lock file covers others
    writer: Mutex<()>,
}

impl FileRecordStore {
    /// Open (creating directories as needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            root: root.as_ref().to_path_buf(),
            writer: Mutex::new(()),
        };
        for kind in KINDS {
            fs::create_dir_all(store.dir(kind)).await?;
        }
        debug!(root = %store.root.display(), "file record store ready");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding records of `kind`
    pub fn dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.plural())
    }

    /// Path of one record's JSON file
    pub fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.dir(key.kind).join(format!("{}.json", key.id))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Acquire the exclusive advisory lock
    pub fn lock(&self) -> StoreResult<StoreLock> {
        let lock_path = self.lock_path();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(StoreLock { file }),
            Err(_) => Err(StoreError::LockBusy),
        }
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Record> {
        let path = self.record_path(key);
        if !path.exists() {
            return Err(StoreError::not_found(key.kind, key.id.clone()));
        }
        let content = fs::read_to_string(&path).await?;
        let record = match key.kind {
            EntityKind::Board => Record::Board(serde_json::from_str::<Board>(&content)?),
            EntityKind::List => Record::List(serde_json::from_str::<List>(&content)?),
            EntityKind::Task => Record::Task(serde_json::from_str::<Task>(&content)?),
        };
        Ok(record)
    }

    async fn write(&self, record: &Record) -> StoreResult<()> {
        let path = self.record_path(&record.key());
        let content = match record {
            Record::Board(board) => serde_json::to_string_pretty(board)?,
            Record::List(list) => serde_json::to_string_pretty(list)?,
            Record::Task(task) => serde_json::to_string_pretty(task)?,
        };
        atomic_write(&path, content.as_bytes()).await
    }

    async fn read_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        let dir = self.dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let key = RecordKey {
                    kind,
                    id: stem.to_string(),
                };
                records.push(self.read(&key).await?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn fetch(&self, key: &RecordKey) -> StoreResult<Record> {
        self.read(key).await
    }

    async fn fetch_many(&self, kind: EntityKind, container_id: &str) -> StoreResult<Vec<Record>> {
        let mut records: Vec<Record> = self
            .read_all(kind)
            .await?
            .into_iter()
            .filter(|r| kind == EntityKind::Board || r.parent_id() == Some(container_id))
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<Record> {
        let _writer = self.writer.lock().await;
        let _lock = self.lock()?;

        if let Some(parent) = record.parent_id() {
            let parent_kind = match record.kind() {
                EntityKind::Task => EntityKind::List,
                _ => EntityKind::Board,
            };
            let parent_key = RecordKey {
                kind: parent_kind,
                id: parent.to_string(),
            };
            if !self.record_path(&parent_key).exists() {
                return Err(StoreError::not_found(parent_kind, parent));
            }
        }

        let created = record.into_record(ulid::Ulid::new().to_string());
        self.write(&created).await?;
        trace!(key = %created.key(), "inserted");
        Ok(created)
    }

    async fn update(&self, key: &RecordKey, patch: &RecordPatch) -> StoreResult<()> {
        let _writer = self.writer.lock().await;
        let _lock = self.lock()?;

        let mut record = self.read(key).await?;
        patch.apply_to(&mut record)?;
        self.write(&record).await?;
        trace!(key = %key, "updated");
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        let _writer = self.writer.lock().await;
        let _lock = self.lock()?;

        let path = self.record_path(key);
        if !path.exists() {
            return Err(StoreError::not_found(key.kind, key.id.clone()));
        }
        fs::remove_file(&path).await?;
        trace!(key = %key, "deleted");
        Ok(())
    }
}

/// RAII lock guard - releases on drop
#[derive(Debug)]
pub struct StoreLock {
    file: std::fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;

    // Rename (atomic on same filesystem)
    fs::rename(&temp_path, path).await?;

    Ok(())
}

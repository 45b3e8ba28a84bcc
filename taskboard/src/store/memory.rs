//! In-memory record store with fault injection and a call journal

use super::{sort_records, EntityKind, NewRecord, Record, RecordKey, RecordPatch, RecordStore};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

/// One call received by a [`MemoryRecordStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch(RecordKey),
    FetchMany { kind: EntityKind, container: String },
    Insert(EntityKind),
    Update { key: RecordKey, patch: RecordPatch },
    Delete(RecordKey),
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert(_) | Self::Update { .. } | Self::Delete(_))
    }
}

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<RecordKey, Record>,
    calls: Vec<StoreCall>,
    failing_updates: HashSet<RecordKey>,
    failing_deletes: HashSet<RecordKey>,
    fail_reads: bool,
    fail_inserts: bool,
    latency: Option<Duration>,
}

/// Process-local record store.
///
/// Every call is journaled before it is answered, including calls that are
/// then failed on purpose.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as-is, bypassing the journal
    pub async fn seed(&self, record: Record) {
        let mut tables = self.tables.lock().await;
        tables.records.insert(record.key(), record);
    }

    /// Read a record without journaling the call
    pub async fn peek(&self, key: &RecordKey) -> Option<Record> {
        self.tables.lock().await.records.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tables.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.lock().await.records.is_empty()
    }

    /// Every call received so far, in arrival order
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.tables.lock().await.calls.clone()
    }

    /// Only inserts, updates and deletes
    pub async fn writes(&self) -> Vec<StoreCall> {
        self.calls().await.into_iter().filter(StoreCall::is_write).collect()
    }

    pub async fn clear_calls(&self) {
        self.tables.lock().await.calls.clear();
    }

    /// Make every update of `key` fail with [`StoreError::Rejected`]
    pub async fn fail_update(&self, key: RecordKey) {
        self.tables.lock().await.failing_updates.insert(key);
    }

    /// Make every delete of `key` fail with [`StoreError::Rejected`]
    pub async fn fail_delete(&self, key: RecordKey) {
        self.tables.lock().await.failing_deletes.insert(key);
    }

    /// Make fetch calls fail with [`StoreError::Unavailable`]
    pub async fn fail_reads(&self, fail: bool) {
        self.tables.lock().await.fail_reads = fail;
    }

    /// Make insert calls fail with [`StoreError::Unavailable`]
    pub async fn fail_inserts(&self, fail: bool) {
        self.tables.lock().await.fail_inserts = fail;
    }

    /// Remove all injected faults
    pub async fn heal(&self) {
        let mut tables = self.tables.lock().await;
        tables.failing_updates.clear();
        tables.failing_deletes.clear();
        tables.fail_reads = false;
        tables.fail_inserts = false;
    }

    /// Delay every call by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.tables.lock().await.latency = latency;
    }

    async fn delay(&self) {
        let latency = self.tables.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(&self, key: &RecordKey) -> StoreResult<Record> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.calls.push(StoreCall::Fetch(key.clone()));
        if tables.fail_reads {
            return Err(StoreError::unavailable("reads disabled"));
        }
        tables
            .records
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key.kind, key.id.clone()))
    }

    async fn fetch_many(&self, kind: EntityKind, container_id: &str) -> StoreResult<Vec<Record>> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.calls.push(StoreCall::FetchMany {
            kind,
            container: container_id.to_string(),
        });
        if tables.fail_reads {
            return Err(StoreError::unavailable("reads disabled"));
        }
        let mut records: Vec<Record> = tables
            .records
            .values()
            .filter(|r| r.kind() == kind)
            .filter(|r| kind == EntityKind::Board || r.parent_id() == Some(container_id))
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<Record> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.calls.push(StoreCall::Insert(record.kind()));
        if tables.fail_inserts {
            return Err(StoreError::unavailable("inserts disabled"));
        }
        if let Some(parent) = record.parent_id() {
            let parent_kind = match record.kind() {
                EntityKind::Task => EntityKind::List,
                _ => EntityKind::Board,
            };
            let parent_key = RecordKey {
                kind: parent_kind,
                id: parent.to_string(),
            };
            if !tables.records.contains_key(&parent_key) {
                return Err(StoreError::not_found(parent_kind, parent));
            }
        }

        let created = record.into_record(ulid::Ulid::new().to_string());
        trace!(key = %created.key(), "inserted");
        tables.records.insert(created.key(), created.clone());
        Ok(created)
    }

    async fn update(&self, key: &RecordKey, patch: &RecordPatch) -> StoreResult<()> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.calls.push(StoreCall::Update {
            key: key.clone(),
            patch: patch.clone(),
        });
        if tables.failing_updates.contains(key) {
            return Err(StoreError::rejected(format!("update of {} refused", key)));
        }
        let record = tables
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found(key.kind, key.id.clone()))?;
        patch.apply_to(record)
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.calls.push(StoreCall::Delete(key.clone()));
        if tables.failing_deletes.contains(key) {
            return Err(StoreError::rejected(format!("delete of {} refused", key)));
        }
        tables
            .records
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(key.kind, key.id.clone()))
    }
}

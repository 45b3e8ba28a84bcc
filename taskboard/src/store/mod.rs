//! Record store: the persistent collaborator behind the synchronizer.
//!
//! The store is a generic keyed record store. It knows nothing about drag
//! gestures or dense ranges; it fetches ordered records, inserts new ones,
//! applies partial updates and deletes by key.

mod file;
mod memory;

pub use file::FileRecordStore;
pub use memory::{MemoryRecordStore, StoreCall};

use crate::error::{StoreError, StoreResult};
use crate::types::{Board, BoardId, List, ListId, NewBoard, NewList, NewTask, Task, TaskDetails, TaskId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use taskboard_config::{StoreBackend, StoreSettings};
use tracing::debug;

/// Kind of record held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    List,
    Task,
}

impl EntityKind {
    /// Directory name used by file-backed storage
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Board => "boards",
            Self::List => "lists",
            Self::Task => "tasks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board => f.write_str("board"),
            Self::List => f.write_str("list"),
            Self::Task => f.write_str("task"),
        }
    }
}

/// Address of one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub kind: EntityKind,
    pub id: String,
}

impl RecordKey {
    pub fn board(id: &BoardId) -> Self {
        Self {
            kind: EntityKind::Board,
            id: id.to_string(),
        }
    }

    pub fn list(id: &ListId) -> Self {
        Self {
            kind: EntityKind::List,
            id: id.to_string(),
        }
    }

    pub fn task(id: &TaskId) -> Self {
        Self {
            kind: EntityKind::Task,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Board(Board),
    List(List),
    Task(Task),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Board(_) => EntityKind::Board,
            Self::List(_) => EntityKind::List,
            Self::Task(_) => EntityKind::Task,
        }
    }

    pub fn key(&self) -> RecordKey {
        match self {
            Self::Board(board) => RecordKey::board(&board.id),
            Self::List(list) => RecordKey::list(&list.id),
            Self::Task(task) => RecordKey::task(&task.id),
        }
    }

    /// Id of the containing record; boards have none
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Board(_) => None,
            Self::List(list) => Some(list.board_id.as_str()),
            Self::Task(task) => Some(task.list_id.as_str()),
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Board(_) => None,
            Self::List(list) => Some(list.position),
            Self::Task(task) => Some(task.position),
        }
    }

    pub fn into_board(self) -> StoreResult<Board> {
        match self {
            Self::Board(board) => Ok(board),
            other => Err(unexpected(EntityKind::Board, &other)),
        }
    }

    pub fn into_list(self) -> StoreResult<List> {
        match self {
            Self::List(list) => Ok(list),
            other => Err(unexpected(EntityKind::List, &other)),
        }
    }

    pub fn into_task(self) -> StoreResult<Task> {
        match self {
            Self::Task(task) => Ok(task),
            other => Err(unexpected(EntityKind::Task, &other)),
        }
    }
}

fn unexpected(wanted: EntityKind, record: &Record) -> StoreError {
    StoreError::rejected(format!("expected a {} record, got {}", wanted, record.key()))
}

/// A record to insert; the store assigns the identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewRecord {
    Board(NewBoard),
    List(NewList),
    Task {
        list_id: ListId,
        position: usize,
        #[serde(flatten)]
        fields: NewTask,
    },
}

impl NewRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Board(_) => EntityKind::Board,
            Self::List(_) => EntityKind::List,
            Self::Task { .. } => EntityKind::Task,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Board(_) => None,
            Self::List(list) => Some(list.board_id.as_str()),
            Self::Task { list_id, .. } => Some(list_id.as_str()),
        }
    }

    /// Materialize with the identifier the store minted
    pub fn into_record(self, id: String) -> Record {
        match self {
            Self::Board(board) => Record::Board(board.into_board(BoardId::from_string(id))),
            Self::List(list) => Record::List(list.into_list(ListId::from_string(id))),
            Self::Task {
                list_id,
                position,
                fields,
            } => Record::Task(fields.into_task(TaskId::from_string(id), list_id, position)),
        }
    }
}

/// Partial update of one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// New parent id; only tasks may change parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "TaskDetails::is_empty")]
    pub details: TaskDetails,
}

impl RecordPatch {
    pub fn position(position: usize) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn reparent(parent: impl Into<String>, position: usize) -> Self {
        Self {
            position: Some(position),
            parent: Some(parent.into()),
            ..Default::default()
        }
    }

    pub fn details(details: TaskDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.parent.is_none() && self.details.is_empty()
    }

    /// Apply to a stored record, refusing fields the record does not have
    pub fn apply_to(&self, record: &mut Record) -> StoreResult<()> {
        match record {
            Record::Board(board) => {
                if self.position.is_some() || self.parent.is_some() {
                    return Err(StoreError::rejected("boards have no position or parent"));
                }
                if let Some(title) = &self.details.title {
                    board.title = title.clone();
                }
                if let Some(description) = &self.details.description {
                    board.description = description.clone();
                }
            }
            Record::List(list) => {
                if self.parent.is_some() {
                    return Err(StoreError::rejected("lists cannot move between boards"));
                }
                if let Some(position) = self.position {
                    list.position = position;
                }
                if let Some(title) = &self.details.title {
                    list.title = title.clone();
                }
            }
            Record::Task(task) => {
                if let Some(position) = self.position {
                    task.position = position;
                }
                if let Some(parent) = &self.parent {
                    task.list_id = ListId::from_string(parent.clone());
                }
                self.details.apply_to(task);
            }
        }
        Ok(())
    }
}

/// Remote persistence for boards, lists and tasks
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Fetch one record
    async fn fetch(&self, key: &RecordKey) -> StoreResult<Record>;

    /// Fetch every record of `kind` whose parent is `container_id`, ordered
    /// by position then id. For boards `container_id` is ignored and every
    /// board is returned, oldest first.
    async fn fetch_many(&self, kind: EntityKind, container_id: &str) -> StoreResult<Vec<Record>>;

    /// Insert a new record, returning it with its assigned identifier
    async fn insert(&self, record: NewRecord) -> StoreResult<Record>;

    /// Apply a partial update
    async fn update(&self, key: &RecordKey, patch: &RecordPatch) -> StoreResult<()>;

    /// Delete one record. Children are not touched.
    async fn delete(&self, key: &RecordKey) -> StoreResult<()>;
}

/// Order records the way `fetch_many` promises
pub(crate) fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| match (a, b) {
        (Record::Board(a), Record::Board(b)) => {
            (a.created_at, a.id.as_str()).cmp(&(b.created_at, b.id.as_str()))
        }
        _ => {
            let a_key = (a.position().unwrap_or(0), a.key().id);
            let b_key = (b.position().unwrap_or(0), b.key().id);
            a_key.cmp(&b_key)
        }
    });
}

/// Open the backend named by configuration
pub async fn open(settings: &StoreSettings) -> StoreResult<Arc<dyn RecordStore>> {
    match settings.backend {
        StoreBackend::Memory => {
            debug!("opening in-memory record store");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        StoreBackend::File => {
            debug!(root = %settings.root.display(), "opening file record store");
            let store = FileRecordStore::open(&settings.root).await?;
            Ok(Arc::new(store))
        }
    }
}

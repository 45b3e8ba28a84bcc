//! Synchronizer: pushes optimistic changes to the record store.
//!
//! Every optimistic operation captures the snapshot it started from, applies
//! its change locally, then spawns a task that issues the remote calls. If
//! any call fails, only what that operation changed is put back into the
//! current state (see [`Revert`]), so operations that started later keep
//! their effect, and a [`SyncNotice`] is broadcast. Partial remote
//! application is tolerated: the containers the
//! failed operation touched are marked dirty, and the next write to a dirty
//! container rewrites the position of every member.

use crate::error::{BoardError, Result, StoreError, StoreResult};
use crate::reorder::ReorderPlan;
use crate::state::{BoardSnapshot, BoardState, Revert};
use crate::store::{NewRecord, Record, RecordKey, RecordPatch, RecordStore};
use crate::types::{ContainerKind, ContainerRef, ListId, NewList, NewTask, TaskDetails, TaskId};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use taskboard_config::SyncSettings;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// What a sync was persisting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    ReorderLists,
    ReorderTasks,
    CreateBoard,
    CreateList,
    CreateTask,
    UpdateTask,
    DeleteTask,
    DeleteList,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReorderLists => "reorder_lists",
            Self::ReorderTasks => "reorder_tasks",
            Self::CreateBoard => "create_board",
            Self::CreateList => "create_list",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::DeleteList => "delete_list",
        };
        f.write_str(name)
    }
}

/// Non-fatal failure report for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncNotice {
    pub operation: SyncOperation,
    pub message: String,
    /// Whether the visible state was restored to its pre-operation snapshot
    pub rolled_back: bool,
}

/// One remote update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub key: RecordKey,
    pub patch: RecordPatch,
}

impl RecordWrite {
    pub fn new(key: RecordKey, patch: RecordPatch) -> Self {
        Self { key, patch }
    }
}

/// Final outcome of a background sync
#[derive(Debug)]
pub enum Settlement {
    /// Every call succeeded; the snapshot is the state at settlement time
    Persisted(Arc<BoardSnapshot>),
    /// A call failed; `snapshot` is the state after the failed change was
    /// reverted
    RolledBack {
        snapshot: Arc<BoardSnapshot>,
        error: BoardError,
    },
}

impl Settlement {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }

    pub fn snapshot(&self) -> &Arc<BoardSnapshot> {
        match self {
            Self::Persisted(snapshot) => snapshot,
            Self::RolledBack { snapshot, .. } => snapshot,
        }
    }

    pub fn into_result(self) -> Result<Arc<BoardSnapshot>> {
        match self {
            Self::Persisted(snapshot) => Ok(snapshot),
            Self::RolledBack { error, .. } => Err(error),
        }
    }
}

/// Handle to a sync running in the background
#[derive(Debug)]
pub struct PendingSync {
    operation: SyncOperation,
    handle: JoinHandle<Settlement>,
}

impl PendingSync {
    pub fn operation(&self) -> SyncOperation {
        self.operation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the sync to settle
    pub async fn settle(self) -> Result<Settlement> {
        self.handle.await.map_err(|e| BoardError::SyncAborted {
            message: e.to_string(),
        })
    }
}

/// Result of an optimistic operation: what the user sees now, and the
/// background sync that will confirm or revert it
#[derive(Debug)]
pub struct Applied {
    pub snapshot: Arc<BoardSnapshot>,
    /// `None` when nothing needed persisting
    pub sync: Option<PendingSync>,
}

impl Applied {
    pub fn unchanged(snapshot: Arc<BoardSnapshot>) -> Self {
        Self {
            snapshot,
            sync: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.sync.is_none()
    }

    /// Wait for persistence; the persisted snapshot or the failure that
    /// caused a rollback
    pub async fn settle(self) -> Result<Arc<BoardSnapshot>> {
        match self.sync {
            None => Ok(self.snapshot),
            Some(pending) => pending.settle().await?.into_result(),
        }
    }
}

/// Run a store call under the configured per-call timeout
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Positions (and parents) of `container` that differ between the two
/// snapshots. With `full`, every member is written.
pub fn container_writes(
    before: &BoardSnapshot,
    after: &BoardSnapshot,
    container: &ContainerRef,
    full: bool,
) -> Vec<RecordWrite> {
    match container {
        ContainerRef::Board(_) => after
            .lists()
            .iter()
            .filter(|list| full || before.list(&list.id).map(|l| l.position) != Some(list.position))
            .map(|list| RecordWrite::new(RecordKey::list(&list.id), RecordPatch::position(list.position)))
            .collect(),
        ContainerRef::List(id) => after
            .tasks_in(id)
            .iter()
            .filter_map(|task| {
                let previous = before.task(&task.id);
                let key = RecordKey::task(&task.id);
                if previous.map(|t| &t.list_id) != Some(&task.list_id) {
                    Some(RecordWrite::new(
                        key,
                        RecordPatch::reparent(task.list_id.to_string(), task.position),
                    ))
                } else if full || previous.map(|t| t.position) != Some(task.position) {
                    Some(RecordWrite::new(key, RecordPatch::position(task.position)))
                } else {
                    None
                }
            })
            .collect(),
    }
}

/// Propagates local changes to a [`RecordStore`]
#[derive(Debug)]
pub struct Synchronizer {
    store: Arc<dyn RecordStore>,
    state: Arc<BoardState>,
    settings: SyncSettings,
    dirty: Mutex<HashSet<ContainerRef>>,
    notices: broadcast::Sender<SyncNotice>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn RecordStore>, state: Arc<BoardState>, settings: SyncSettings) -> Self {
        let (notices, _) = broadcast::channel(settings.notice_capacity.max(1));
        Self {
            store,
            state,
            settings,
            dirty: Mutex::new(HashSet::new()),
            notices,
        }
    }

    pub fn state(&self) -> &Arc<BoardState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Failure notices from now on
    pub fn notifications(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    pub fn is_dirty(&self, container: &ContainerRef) -> bool {
        self.dirty_set().contains(container)
    }

    /// Sorted for stable output
    pub fn dirty_containers(&self) -> Vec<ContainerRef> {
        let mut containers: Vec<ContainerRef> = self.dirty_set().iter().cloned().collect();
        containers.sort();
        containers
    }

    pub fn mark_dirty<'a>(&self, containers: impl IntoIterator<Item = &'a ContainerRef>) {
        let mut dirty = self.dirty_set();
        for container in containers {
            debug!(%container, "container marked dirty");
            dirty.insert(container.clone());
        }
    }

    fn clear_dirty<'a>(&self, containers: impl IntoIterator<Item = &'a ContainerRef>) {
        let mut dirty = self.dirty_set();
        for container in containers {
            if dirty.remove(container) {
                debug!(%container, "container healed");
            }
        }
    }

    fn dirty_set(&self) -> std::sync::MutexGuard<'_, HashSet<ContainerRef>> {
        self.dirty.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rewrite_all(&self, container: &ContainerRef) -> bool {
        self.settings.heal_dirty_containers && self.is_dirty(container)
    }

    fn notify(&self, operation: SyncOperation, message: String, rolled_back: bool) {
        // No subscribers is fine
        let _ = self.notices.send(SyncNotice {
            operation,
            message,
            rolled_back,
        });
    }

    fn writes_for(
        &self,
        before: &BoardSnapshot,
        after: &BoardSnapshot,
        containers: &[ContainerRef],
    ) -> Vec<RecordWrite> {
        containers
            .iter()
            .flat_map(|c| container_writes(before, after, c, self.rewrite_all(c)))
            .collect()
    }

    // =========================================================================
    // Optimistic operations
    // =========================================================================

    /// Apply a reorder plan locally and persist it in the background
    pub fn reorder(self: &Arc<Self>, plan: &ReorderPlan) -> Result<Applied> {
        let operation = match plan.kind() {
            ContainerKind::List => SyncOperation::ReorderLists,
            ContainerKind::Task => SyncOperation::ReorderTasks,
        };
        let before = self.state.snapshot();
        let after = self.state.apply_reorder(plan)?;
        let containers = plan.containers();
        let writes = self.writes_for(&before, &after, &containers);
        debug!(%operation, writes = writes.len(), "reorder applied locally");

        if writes.is_empty() {
            return Ok(Applied::unchanged(after));
        }

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            match sync.execute(&writes).await {
                Ok(()) => {
                    sync.clear_dirty(&containers);
                    info!(%operation, writes = writes.len(), "reorder persisted");
                    Settlement::Persisted(sync.state.snapshot())
                }
                Err(source) => {
                    let revert = Revert::Order(containers.clone());
                    sync.roll_back(operation, &before, revert, &containers, source)
                }
            }
        });
        Ok(Applied {
            snapshot: after,
            sync: Some(PendingSync { operation, handle }),
        })
    }

    /// Edit a task's descriptive fields locally and persist them
    pub fn update_task(self: &Arc<Self>, id: &TaskId, details: TaskDetails) -> Result<Applied> {
        let operation = SyncOperation::UpdateTask;
        if details.is_empty() {
            if self.state.snapshot().task(id).is_none() {
                return Err(BoardError::TaskNotFound { id: id.to_string() });
            }
            return Ok(Applied::unchanged(self.state.snapshot()));
        }

        let before = self.state.snapshot();
        let after = self.state.edit_task(id, &details)?;
        let key = RecordKey::task(id);
        let key_id = id.clone();
        let patch = RecordPatch::details(details);

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let timeout = sync.settings.write_timeout();
            match with_timeout(timeout, sync.store.update(&key, &patch)).await {
                Ok(()) => Settlement::Persisted(sync.state.snapshot()),
                Err(source) => {
                    sync.roll_back(operation, &before, Revert::Details(key_id), &[], source)
                }
            }
        });
        Ok(Applied {
            snapshot: after,
            sync: Some(PendingSync { operation, handle }),
        })
    }

    /// Remove a task locally, delete it remotely, then compact its siblings
    pub fn delete_task(self: &Arc<Self>, id: &TaskId) -> Result<Applied> {
        let operation = SyncOperation::DeleteTask;
        let before = self.state.snapshot();
        let (after, removed) = self.state.remove_task(id)?;
        let container = ContainerRef::List(removed.list_id.clone());
        let key = RecordKey::task(id);

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let timeout = sync.settings.write_timeout();
            if let Err(source) = with_timeout(timeout, sync.store.delete(&key)).await {
                return sync.roll_back(operation, &before, Revert::Task(removed), &[], source);
            }
            sync.compact(operation, &before, &[container]).await
        });
        Ok(Applied {
            snapshot: after,
            sync: Some(PendingSync { operation, handle }),
        })
    }

    /// Remove a list and its tasks locally. Remotely every task is deleted
    /// first; the list is deleted only once they all succeeded.
    pub fn delete_list(self: &Arc<Self>, id: &ListId) -> Result<Applied> {
        let operation = SyncOperation::DeleteList;
        let before = self.state.snapshot();
        let (after, (list, tasks)) = self.state.remove_list(id)?;
        let task_keys: Vec<RecordKey> = tasks.iter().map(|t| RecordKey::task(&t.id)).collect();
        let list_key = RecordKey::list(&list.id);
        let list_container = ContainerRef::List(list.id.clone());
        let board_container = ContainerRef::Board(list.board_id.clone());

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            debug!(list = %list_key.id, tasks = task_keys.len(), "deleting list tasks");
            if let Err((deleted, source)) = sync.delete_all(&task_keys).await {
                // The first `deleted` tasks are gone remotely
                let survivors = tasks.into_iter().skip(deleted).collect();
                let revert = Revert::List { list, tasks: survivors };
                return sync.roll_back(operation, &before, revert, &[list_container], source);
            }

            let timeout = sync.settings.write_timeout();
            if let Err(source) = with_timeout(timeout, sync.store.delete(&list_key)).await {
                // Every task is gone remotely; only the empty list comes back
                let revert = Revert::List { list, tasks: Vec::new() };
                return sync.roll_back(operation, &before, revert, &[], source);
            }

            sync.clear_dirty([&list_container]);
            sync.compact(operation, &before, &[board_container]).await
        });
        Ok(Applied {
            snapshot: after,
            sync: Some(PendingSync { operation, handle }),
        })
    }

    // =========================================================================
    // Confirmed operations
    // =========================================================================

    /// Insert a list remotely at the end of the board, then append it locally
    pub async fn create_list(&self, title: impl Into<String>) -> Result<Arc<BoardSnapshot>> {
        let operation = SyncOperation::CreateList;
        let snapshot = self.state.snapshot();
        let record = NewRecord::List(NewList {
            board_id: snapshot.board().id.clone(),
            title: title.into(),
            position: snapshot.lists().len(),
        });

        let list = self
            .confirmed_insert(operation, record)
            .await?
            .into_list()
            .map_err(|source| BoardError::RemoteWriteFailure { operation, source })?;
        let stored_position = list.position;
        let list_id = list.id.clone();
        let after = self.state.insert_list(list)?;

        if after.list(&list_id).map(|l| l.position) != Some(stored_position) {
            self.mark_dirty([&ContainerRef::Board(after.board().id.clone())]);
        }
        info!(list = %list_id, "list created");
        Ok(after)
    }

    /// Insert a task remotely at the end of `list`, then append it locally
    pub async fn create_task(&self, list: &ListId, task: NewTask) -> Result<Arc<BoardSnapshot>> {
        let operation = SyncOperation::CreateTask;
        let snapshot = self.state.snapshot();
        if snapshot.list(list).is_none() {
            return Err(BoardError::ListNotFound { id: list.to_string() });
        }
        let record = NewRecord::Task {
            list_id: list.clone(),
            position: snapshot.tasks_in(list).len(),
            fields: task,
        };

        let task = self
            .confirmed_insert(operation, record)
            .await?
            .into_task()
            .map_err(|source| BoardError::RemoteWriteFailure { operation, source })?;
        let stored_position = task.position;
        let task_id = task.id.clone();
        let after = self.state.insert_task(task)?;

        if after.task(&task_id).map(|t| t.position) != Some(stored_position) {
            self.mark_dirty([&ContainerRef::List(list.clone())]);
        }
        info!(task = %task_id, list = %list, "task created");
        Ok(after)
    }

    async fn confirmed_insert(&self, operation: SyncOperation, record: NewRecord) -> Result<Record> {
        let timeout = self.settings.write_timeout();
        match with_timeout(timeout, self.store.insert(record)).await {
            Ok(record) => Ok(record),
            Err(source) => {
                let error = BoardError::RemoteWriteFailure { operation, source };
                warn!(%operation, %error, "insert failed");
                self.notify(operation, error.to_string(), false);
                Err(error)
            }
        }
    }

    // =========================================================================
    // Remote call plumbing
    // =========================================================================

    /// Issue updates with bounded concurrency, stopping at the first failure
    async fn execute(&self, writes: &[RecordWrite]) -> StoreResult<()> {
        let timeout = self.settings.write_timeout();
        let calls: Vec<_> = writes
            .iter()
            .cloned()
            .map(|write| {
                let store = Arc::clone(&self.store);
                async move {
                    trace!(key = %write.key, patch = ?write.patch, "issuing update");
                    with_timeout(timeout, store.update(&write.key, &write.patch)).await
                }
            })
            .collect();
        let mut results = stream::iter(calls).buffered(self.settings.max_concurrent_writes.max(1));

        while let Some(result) = results.next().await {
            result?;
        }
        Ok(())
    }

    /// Delete every key in order. On failure, reports how many leading keys
    /// were confirmed deleted.
    async fn delete_all(&self, keys: &[RecordKey]) -> std::result::Result<(), (usize, StoreError)> {
        let timeout = self.settings.write_timeout();
        let calls: Vec<_> = keys
            .iter()
            .cloned()
            .map(|key| {
                let store = Arc::clone(&self.store);
                async move {
                    trace!(%key, "issuing delete");
                    with_timeout(timeout, store.delete(&key)).await
                }
            })
            .collect();
        let mut results = stream::iter(calls).buffered(self.settings.max_concurrent_writes.max(1));

        let mut deleted = 0;
        while let Some(result) = results.next().await {
            result.map_err(|error| (deleted, error))?;
            deleted += 1;
        }
        Ok(())
    }

    /// Close the gap a confirmed delete left. The delete stands even if this
    /// fails; the container is marked dirty instead.
    async fn compact(
        &self,
        operation: SyncOperation,
        before: &BoardSnapshot,
        containers: &[ContainerRef],
    ) -> Settlement {
        let current = self.state.snapshot();
        let writes = self.writes_for(before, &current, containers);
        match self.execute(&writes).await {
            Ok(()) => {
                self.clear_dirty(containers);
                info!(%operation, compacted = writes.len(), "delete persisted");
            }
            Err(source) => {
                let error = BoardError::RemoteWriteFailure { operation, source };
                warn!(%operation, %error, "compaction after delete failed");
                self.mark_dirty(containers);
                self.notify(operation, error.to_string(), false);
            }
        }
        Settlement::Persisted(self.state.snapshot())
    }

    fn roll_back(
        &self,
        operation: SyncOperation,
        before: &BoardSnapshot,
        revert: Revert,
        containers: &[ContainerRef],
        source: StoreError,
    ) -> Settlement {
        let error = BoardError::RemoteWriteFailure { operation, source };
        warn!(%operation, %error, "remote write failed, reverting");
        let snapshot = match self.state.revert(before, &revert) {
            Ok(snapshot) => snapshot,
            Err(revert_error) => {
                warn!(%operation, error = %revert_error, "revert left state unchanged");
                self.state.snapshot()
            }
        };
        self.mark_dirty(containers);
        self.notify(operation, error.to_string(), true);
        Settlement::RolledBack { snapshot, error }
    }
}

//! Board session: the UI-facing entry points for one open board

use crate::error::{BoardError, Result};
use crate::gesture::{translate, DragEnd};
use crate::reorder::{self, Gesture};
use crate::state::{BoardSnapshot, BoardState};
use crate::store::{EntityKind, NewRecord, RecordKey, RecordStore};
use crate::sync::{with_timeout, Applied, SyncNotice, SyncOperation, Synchronizer};
use crate::types::{Board, BoardId, ContainerKind, ContainerRef, List, ListId, NewBoard, NewTask, Task, TaskDetails, TaskId};
use futures::future::try_join_all;
use std::sync::Arc;
use taskboard_config::SyncSettings;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// An open board: optimistic state plus the synchronizer persisting it
#[derive(Debug, Clone)]
pub struct BoardSession {
    state: Arc<BoardState>,
    sync: Arc<Synchronizer>,
}

impl BoardSession {
    /// Wrap an already assembled snapshot
    pub fn new(store: Arc<dyn RecordStore>, snapshot: BoardSnapshot, settings: SyncSettings) -> Self {
        let state = Arc::new(BoardState::new(snapshot));
        let sync = Arc::new(Synchronizer::new(store, Arc::clone(&state), settings));
        Self { state, sync }
    }

    /// Fetch a board with its lists and tasks in stored order.
    ///
    /// Any failed read fails the whole load. Containers whose stored
    /// positions are not dense are re-ranked locally and marked dirty, so the
    /// next write to them repairs the stored rows.
    pub async fn load(
        store: Arc<dyn RecordStore>,
        board_id: &BoardId,
        settings: SyncSettings,
    ) -> Result<Self> {
        let timeout = settings.read_timeout();
        let read_failure = |source| BoardError::RemoteReadFailure { source };

        let board = with_timeout(timeout, store.fetch(&RecordKey::board(board_id)))
            .await
            .and_then(|r| r.into_board())
            .map_err(read_failure)?;

        let lists: Vec<List> = with_timeout(
            timeout,
            store.fetch_many(EntityKind::List, board_id.as_str()),
        )
        .await
        .map_err(read_failure)?
        .into_iter()
        .map(|r| r.into_list())
        .collect::<std::result::Result<_, _>>()
        .map_err(read_failure)?;

        let per_list = try_join_all(lists.iter().map(|list| {
            with_timeout(timeout, store.fetch_many(EntityKind::Task, list.id.as_str()))
        }))
        .await
        .map_err(read_failure)?;
        let tasks: Vec<Task> = per_list
            .into_iter()
            .flatten()
            .map(|r| r.into_task())
            .collect::<std::result::Result<_, _>>()
            .map_err(read_failure)?;

        let (snapshot, renumbered) = BoardSnapshot::from_records(board, lists, tasks)?;
        info!(
            board = %board_id,
            lists = snapshot.lists().len(),
            tasks = snapshot.task_count(),
            "board loaded"
        );

        let session = Self::new(store, snapshot, settings);
        if !renumbered.is_empty() {
            warn!(containers = renumbered.len(), "stored positions were not dense");
            session.sync.mark_dirty(&renumbered);
        }
        Ok(session)
    }

    /// Create a board record (the dashboard's "create board")
    pub async fn create_board(
        store: &dyn RecordStore,
        board: NewBoard,
        settings: &SyncSettings,
    ) -> Result<Board> {
        let operation = SyncOperation::CreateBoard;
        let board = with_timeout(settings.write_timeout(), store.insert(NewRecord::Board(board)))
            .await
            .and_then(|r| r.into_board())
            .map_err(|source| BoardError::RemoteWriteFailure { operation, source })?;
        info!(board = %board.id, title = %board.title, "board created");
        Ok(board)
    }

    pub fn board_id(&self) -> BoardId {
        self.state.snapshot().board().id.clone()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.state.snapshot()
    }

    /// Every snapshot published from now on: optimistic, settled, restored
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardSnapshot>> {
        self.state.subscribe()
    }

    /// Failure notices from now on
    pub fn notifications(&self) -> broadcast::Receiver<SyncNotice> {
        self.sync.notifications()
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    pub fn is_dirty(&self, container: &ContainerRef) -> bool {
        self.sync.is_dirty(container)
    }

    // =========================================================================
    // Drag handlers
    // =========================================================================

    /// Drag-end handler for the board's list container
    pub fn on_list_drag_end(&self, event: DragEnd) -> Result<Applied> {
        self.on_drag_end_of(event, ContainerKind::List)
    }

    /// Drag-end handler for list task containers
    pub fn on_task_drag_end(&self, event: DragEnd) -> Result<Applied> {
        self.on_drag_end_of(event, ContainerKind::Task)
    }

    /// Parse a raw drag-end event and dispatch on its type
    pub fn on_drag_end_json(&self, raw: &str) -> Result<Applied> {
        let event = DragEnd::from_json(raw)?;
        let kind = event.kind;
        self.on_drag_end_of(event, kind)
    }

    fn on_drag_end_of(&self, event: DragEnd, kind: ContainerKind) -> Result<Applied> {
        debug!(draggable = %event.draggable_id, %kind, reason = ?event.reason, "drag ended");
        match translate(event, kind)? {
            Some(gesture) => self.reorder(&gesture),
            None => {
                debug!("drag landed outside any container");
                Ok(Applied::unchanged(self.snapshot()))
            }
        }
    }

    /// Plan, apply and persist a gesture. Dropping in place writes nothing.
    pub fn reorder(&self, gesture: &Gesture) -> Result<Applied> {
        let snapshot = self.state.snapshot();
        match reorder::plan(&snapshot, gesture)? {
            Some(plan) => {
                debug!(
                    moved = %gesture.moved_id,
                    containers = plan.containers().len(),
                    "reorder planned"
                );
                self.sync.reorder(&plan)
            }
            None => {
                debug!(moved = %gesture.moved_id, "dropped in place");
                Ok(Applied::unchanged(snapshot))
            }
        }
    }

    /// Move a list to `to` among the board's lists
    pub fn move_list(&self, id: &ListId, to: usize) -> Result<Applied> {
        let snapshot = self.state.snapshot();
        let from = snapshot
            .lists()
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| BoardError::ListNotFound { id: id.to_string() })?;
        let board = snapshot.board().id.to_string();
        self.reorder(&Gesture::list(id.as_str(), board, from, to))
    }

    /// Move a task to index `to` of list `to_list`
    pub fn move_task(&self, id: &TaskId, to_list: &ListId, to: usize) -> Result<Applied> {
        let snapshot = self.state.snapshot();
        let task = snapshot
            .task(id)
            .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })?;
        self.reorder(&Gesture::task(
            id.as_str(),
            task.list_id.as_str(),
            task.position,
            to_list.as_str(),
            to,
        ))
    }

    // =========================================================================
    // Create, edit, delete
    // =========================================================================

    /// Append a list; confirmed remotely before it appears locally
    pub async fn add_list(&self, title: impl Into<String>) -> Result<Arc<BoardSnapshot>> {
        self.sync.create_list(title).await
    }

    /// Append a task to `list`; confirmed remotely before it appears locally
    pub async fn add_task(&self, list: &ListId, task: NewTask) -> Result<Arc<BoardSnapshot>> {
        self.sync.create_task(list, task).await
    }

    pub fn update_task(&self, id: &TaskId, details: TaskDetails) -> Result<Applied> {
        self.sync.update_task(id, details)
    }

    pub fn delete_task(&self, id: &TaskId) -> Result<Applied> {
        self.sync.delete_task(id)
    }

    pub fn delete_list(&self, id: &ListId) -> Result<Applied> {
        self.sync.delete_list(id)
    }
}

//! Reorder engine.
//!
//! Turns a validated drag gesture into a [`ReorderPlan`]: the complete new
//! dense positions of every container the move touches, plus the one
//! reparent a cross-list move implies. Planning is pure; applying and
//! persisting the plan is the job of [`crate::state`] and [`crate::sync`].

use crate::error::{BoardError, Result};
use crate::position::{assign_dense_positions, is_unchanged, reinsert, transfer, Endpoint, PositionError};
use crate::state::BoardSnapshot;
use crate::types::{BoardId, ContainerKind, ContainerRef, ListId, TaskId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One end of a drag: a container id and a zero-based index inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub container_id: String,
    pub index: usize,
}

impl Slot {
    pub fn new(container_id: impl Into<String>, index: usize) -> Self {
        Self {
            container_id: container_id.into(),
            index,
        }
    }
}

/// A completed drag, already reduced to plain indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    pub kind: ContainerKind,
    pub moved_id: String,
    pub source: Slot,
    pub destination: Slot,
}

impl Gesture {
    /// Move list `moved` within `board` from one index to another
    pub fn list(moved: impl Into<String>, board: impl Into<String>, from: usize, to: usize) -> Self {
        let board = board.into();
        Self {
            kind: ContainerKind::List,
            moved_id: moved.into(),
            source: Slot::new(board.clone(), from),
            destination: Slot::new(board, to),
        }
    }

    /// Move task `moved` from `from_list[from]` to `to_list[to]`
    pub fn task(
        moved: impl Into<String>,
        from_list: impl Into<String>,
        from: usize,
        to_list: impl Into<String>,
        to: usize,
    ) -> Self {
        Self {
            kind: ContainerKind::Task,
            moved_id: moved.into(),
            source: Slot::new(from_list, from),
            destination: Slot::new(to_list, to),
        }
    }

    pub fn is_same_container(&self) -> bool {
        self.source.container_id == self.destination.container_id
    }
}

/// New positions for one list's tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBatch {
    pub list: ListId,
    pub positions: IndexMap<TaskId, usize>,
}

/// The moved task changes parent list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reparent {
    pub task: TaskId,
    pub from: ListId,
    pub to: ListId,
}

/// Everything a move changes, expressed as whole-container rankings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderPlan {
    /// Re-rank the board's lists
    Lists {
        board: BoardId,
        positions: IndexMap<ListId, usize>,
    },
    /// Re-rank one list, or two for a cross-list move
    Tasks {
        /// Source first, then destination
        batches: Vec<TaskBatch>,
        reparent: Option<Reparent>,
    },
}

impl ReorderPlan {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Lists { .. } => ContainerKind::List,
            Self::Tasks { .. } => ContainerKind::Task,
        }
    }

    /// Containers whose members get new positions
    pub fn containers(&self) -> Vec<ContainerRef> {
        match self {
            Self::Lists { board, .. } => vec![ContainerRef::Board(board.clone())],
            Self::Tasks { batches, .. } => batches
                .iter()
                .map(|b| ContainerRef::List(b.list.clone()))
                .collect(),
        }
    }

    pub fn reparent(&self) -> Option<&Reparent> {
        match self {
            Self::Lists { .. } => None,
            Self::Tasks { reparent, .. } => reparent.as_ref(),
        }
    }
}

/// Plan the effect of `gesture` on `snapshot`.
///
/// Returns `Ok(None)` when the element is dropped back where it started.
/// Unknown containers, out-of-range indices and a source slot that no
/// longer holds `moved_id` are rejected with [`BoardError::InvalidGesture`].
pub fn plan(snapshot: &BoardSnapshot, gesture: &Gesture) -> Result<Option<ReorderPlan>> {
    match gesture.kind {
        ContainerKind::List => plan_lists(snapshot, gesture),
        ContainerKind::Task => plan_tasks(snapshot, gesture),
    }
}

fn plan_lists(snapshot: &BoardSnapshot, gesture: &Gesture) -> Result<Option<ReorderPlan>> {
    let board = &snapshot.board().id;
    if gesture.source.container_id != board.as_str()
        || gesture.destination.container_id != board.as_str()
    {
        return Err(BoardError::invalid_gesture(format!(
            "lists can only move within board {}",
            board
        )));
    }

    let order = snapshot.list_ids();
    verify_moved(&order, gesture)?;
    if is_unchanged(true, gesture.source.index, gesture.destination.index) {
        return Ok(None);
    }

    let reordered = reinsert(&order, gesture.source.index, gesture.destination.index)?;
    Ok(Some(ReorderPlan::Lists {
        board: board.clone(),
        positions: assign_dense_positions(&reordered),
    }))
}

fn plan_tasks(snapshot: &BoardSnapshot, gesture: &Gesture) -> Result<Option<ReorderPlan>> {
    let source = known_list(snapshot, &gesture.source.container_id)?;
    let destination = known_list(snapshot, &gesture.destination.container_id)?;

    let source_ids = snapshot.task_ids_in(&source);
    verify_moved(&source_ids, gesture)?;

    let same = source == destination;
    if is_unchanged(same, gesture.source.index, gesture.destination.index) {
        return Ok(None);
    }

    if same {
        let reordered = reinsert(&source_ids, gesture.source.index, gesture.destination.index)?;
        return Ok(Some(ReorderPlan::Tasks {
            batches: vec![TaskBatch {
                list: source,
                positions: assign_dense_positions(&reordered),
            }],
            reparent: None,
        }));
    }

    let destination_ids = snapshot.task_ids_in(&destination);
    let (remaining, received) = transfer(
        &source_ids,
        gesture.source.index,
        &destination_ids,
        gesture.destination.index,
    )?;
    Ok(Some(ReorderPlan::Tasks {
        batches: vec![
            TaskBatch {
                list: source.clone(),
                positions: assign_dense_positions(&remaining),
            },
            TaskBatch {
                list: destination.clone(),
                positions: assign_dense_positions(&received),
            },
        ],
        reparent: Some(Reparent {
            task: TaskId::from_string(gesture.moved_id.clone()),
            from: source,
            to: destination,
        }),
    }))
}

fn known_list(snapshot: &BoardSnapshot, id: &str) -> Result<ListId> {
    let id = ListId::from_string(id);
    match snapshot.list(&id) {
        Some(_) => Ok(id),
        None => Err(BoardError::invalid_gesture(format!("unknown list {}", id))),
    }
}

/// The source slot must still hold the dragged element
fn verify_moved<T: AsRef<str>>(members: &[T], gesture: &Gesture) -> Result<()> {
    let index = gesture.source.index;
    match members.get(index) {
        None => Err(PositionError::IndexOutOfRange {
            endpoint: Endpoint::Source,
            index,
            len: members.len(),
        }
        .into()),
        Some(found) if found.as_ref() != gesture.moved_id => {
            Err(BoardError::invalid_gesture(format!(
                "stale gesture: expected {} at index {}, found {}",
                gesture.moved_id,
                index,
                found.as_ref()
            )))
        }
        Some(_) => Ok(()),
    }
}

//! Optimistic state store.
//!
//! [`BoardState`] holds the in-process view of one board as an immutable
//! [`BoardSnapshot`] behind a `tokio::sync::watch` channel. Every mutation
//! clones the current snapshot, edits the clone, checks the dense-range
//! invariants and swaps it in under the channel's lock, so readers only ever
//! see whole snapshots. The store performs no I/O.

use crate::error::{BoardError, Result};
use crate::position::is_dense;
use crate::reorder::ReorderPlan;
use crate::types::{Board, ContainerRef, List, ListId, Task, TaskDetails, TaskId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// One consistent view of a board, its lists and their tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    board: Board,
    /// Sorted by position
    lists: Vec<List>,
    /// Every list has an entry, each sorted by position
    tasks: HashMap<ListId, Vec<Task>>,
}

impl BoardSnapshot {
    /// Build from records whose positions already satisfy the invariants
    pub fn new(board: Board, lists: Vec<List>, tasks: Vec<Task>) -> Result<Self> {
        let snapshot = Self::assemble(board, lists, tasks)?;
        snapshot.check_invariants()?;
        Ok(snapshot)
    }

    /// Build from stored records, re-ranking any container whose stored
    /// positions have gaps or duplicates.
    ///
    /// Members keep their stored relative order (ties broken by id). Returns
    /// the containers that had to be re-ranked.
    pub fn from_records(
        board: Board,
        lists: Vec<List>,
        tasks: Vec<Task>,
    ) -> Result<(Self, Vec<ContainerRef>)> {
        let mut snapshot = Self::assemble(board, lists, tasks)?;
        let mut renumbered = Vec::new();

        if !is_dense(snapshot.lists.iter().map(|l| l.position)) {
            for (position, list) in snapshot.lists.iter_mut().enumerate() {
                list.position = position;
            }
            renumbered.push(ContainerRef::Board(snapshot.board.id.clone()));
        }

        for list in &snapshot.lists {
            if let Some(tasks) = snapshot.tasks.get_mut(&list.id) {
                if !is_dense(tasks.iter().map(|t| t.position)) {
                    for (position, task) in tasks.iter_mut().enumerate() {
                        task.position = position;
                    }
                    renumbered.push(ContainerRef::List(list.id.clone()));
                }
            }
        }

        snapshot.check_invariants()?;
        Ok((snapshot, renumbered))
    }

    fn assemble(board: Board, mut lists: Vec<List>, tasks: Vec<Task>) -> Result<Self> {
        let mut seen = HashSet::new();
        for list in &lists {
            if list.board_id != board.id {
                return Err(BoardError::invariant(format!(
                    "list {} belongs to board {}, not {}",
                    list.id, list.board_id, board.id
                )));
            }
            if !seen.insert(list.id.clone()) {
                return Err(BoardError::invariant(format!("duplicate list {}", list.id)));
            }
        }
        lists.sort_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)));

        let mut grouped: HashMap<ListId, Vec<Task>> =
            lists.iter().map(|l| (l.id.clone(), Vec::new())).collect();
        let mut seen_tasks = HashSet::new();
        for task in tasks {
            if !seen_tasks.insert(task.id.clone()) {
                return Err(BoardError::invariant(format!("duplicate task {}", task.id)));
            }
            match grouped.get_mut(&task.list_id) {
                Some(members) => members.push(task),
                None => {
                    return Err(BoardError::invariant(format!(
                        "task {} references list {} outside board {}",
                        task.id, task.list_id, board.id
                    )))
                }
            }
        }
        for members in grouped.values_mut() {
            members.sort_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)));
        }

        Ok(Self {
            board,
            lists,
            tasks: grouped,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Lists in position order
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    pub fn list(&self, id: &ListId) -> Option<&List> {
        self.lists.iter().find(|l| &l.id == id)
    }

    pub fn list_ids(&self) -> Vec<ListId> {
        self.lists.iter().map(|l| l.id.clone()).collect()
    }

    /// Tasks of a list in position order; empty for unknown lists
    pub fn tasks_in(&self, list: &ListId) -> &[Task] {
        self.tasks.get(list).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn task_ids_in(&self, list: &ListId) -> Vec<TaskId> {
        self.tasks_in(list).iter().map(|t| t.id.clone()).collect()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.values().flatten().find(|t| &t.id == id)
    }

    /// All tasks, list by list in board order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.lists.iter().flat_map(|l| self.tasks_in(&l.id).iter())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    /// `(id, position)` of every member of a container, in order
    pub fn members(&self, container: &ContainerRef) -> Vec<(String, usize)> {
        match container {
            ContainerRef::Board(_) => self
                .lists
                .iter()
                .map(|l| (l.id.to_string(), l.position))
                .collect(),
            ContainerRef::List(id) => self
                .tasks_in(id)
                .iter()
                .map(|t| (t.id.to_string(), t.position))
                .collect(),
        }
    }

    /// Dense ranges everywhere, storage order matches positions, and every
    /// task sits in the vector of the list it points at
    pub fn check_invariants(&self) -> Result<()> {
        for (index, list) in self.lists.iter().enumerate() {
            if list.position != index {
                return Err(BoardError::invariant(format!(
                    "list {} at index {} has position {}",
                    list.id, index, list.position
                )));
            }
        }
        if self.tasks.len() != self.lists.len() {
            return Err(BoardError::invariant("task groups do not match lists"));
        }
        for (list_id, tasks) in &self.tasks {
            if self.list(list_id).is_none() {
                return Err(BoardError::invariant(format!(
                    "tasks grouped under unknown list {}",
                    list_id
                )));
            }
            for (index, task) in tasks.iter().enumerate() {
                if &task.list_id != list_id {
                    return Err(BoardError::invariant(format!(
                        "task {} stored under {} but points at {}",
                        task.id, list_id, task.list_id
                    )));
                }
                if task.position != index {
                    return Err(BoardError::invariant(format!(
                        "task {} at index {} has position {}",
                        task.id, index, task.position
                    )));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Mutations. Only called on a private clone inside BoardState::update.
    // =========================================================================

    fn apply_plan(&mut self, plan: &ReorderPlan) -> Result<()> {
        match plan {
            ReorderPlan::Lists { board, positions } => {
                if board != &self.board.id {
                    return Err(BoardError::invariant(format!(
                        "plan for board {} applied to board {}",
                        board, self.board.id
                    )));
                }
                let current: HashSet<&ListId> = self.lists.iter().map(|l| &l.id).collect();
                let planned: HashSet<&ListId> = positions.keys().collect();
                if current != planned || !is_dense(positions.values().copied()) {
                    return Err(BoardError::invariant(
                        "list plan does not cover the board's lists",
                    ));
                }
                for list in &mut self.lists {
                    list.position = positions[&list.id];
                }
                self.lists.sort_by_key(|l| l.position);
            }
            ReorderPlan::Tasks { batches, reparent } => {
                if let Some(reparent) = reparent {
                    let source = self.tasks.get_mut(&reparent.from).ok_or_else(|| {
                        BoardError::ListNotFound {
                            id: reparent.from.to_string(),
                        }
                    })?;
                    let index = source
                        .iter()
                        .position(|t| t.id == reparent.task)
                        .ok_or_else(|| BoardError::TaskNotFound {
                            id: reparent.task.to_string(),
                        })?;
                    let mut moved = source.remove(index);
                    moved.list_id = reparent.to.clone();
                    self.tasks
                        .get_mut(&reparent.to)
                        .ok_or_else(|| BoardError::ListNotFound {
                            id: reparent.to.to_string(),
                        })?
                        .push(moved);
                }

                for batch in batches {
                    let members = self.tasks.get_mut(&batch.list).ok_or_else(|| {
                        BoardError::ListNotFound {
                            id: batch.list.to_string(),
                        }
                    })?;
                    let current: HashSet<&TaskId> = members.iter().map(|t| &t.id).collect();
                    let planned: HashSet<&TaskId> = batch.positions.keys().collect();
                    if current != planned || !is_dense(batch.positions.values().copied()) {
                        return Err(BoardError::invariant(format!(
                            "task plan does not cover list {}",
                            batch.list
                        )));
                    }
                    for task in members.iter_mut() {
                        task.position = batch.positions[&task.id];
                    }
                    members.sort_by_key(|t| t.position);
                }
            }
        }
        Ok(())
    }

    /// Append at the end of the board, whatever position the record carries
    fn push_list(&mut self, mut list: List) -> Result<()> {
        if list.board_id != self.board.id {
            return Err(BoardError::invariant(format!(
                "list {} belongs to another board",
                list.id
            )));
        }
        if self.list(&list.id).is_some() {
            return Err(BoardError::invariant(format!("duplicate list {}", list.id)));
        }
        list.position = self.lists.len();
        self.tasks.insert(list.id.clone(), Vec::new());
        self.lists.push(list);
        Ok(())
    }

    /// Append at the end of the task's list
    fn push_task(&mut self, mut task: Task) -> Result<()> {
        if self.task(&task.id).is_some() {
            return Err(BoardError::invariant(format!("duplicate task {}", task.id)));
        }
        let members = self
            .tasks
            .get_mut(&task.list_id)
            .ok_or_else(|| BoardError::ListNotFound {
                id: task.list_id.to_string(),
            })?;
        task.position = members.len();
        members.push(task);
        Ok(())
    }

    /// Remove a task and close the gap it leaves
    fn remove_task(&mut self, id: &TaskId) -> Result<Task> {
        for members in self.tasks.values_mut() {
            if let Some(index) = members.iter().position(|t| &t.id == id) {
                let removed = members.remove(index);
                for (position, task) in members.iter_mut().enumerate() {
                    task.position = position;
                }
                return Ok(removed);
            }
        }
        Err(BoardError::TaskNotFound { id: id.to_string() })
    }

    /// Remove a list with all its tasks and close the gap among lists
    fn remove_list(&mut self, id: &ListId) -> Result<(List, Vec<Task>)> {
        let index = self
            .lists
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| BoardError::ListNotFound { id: id.to_string() })?;
        let list = self.lists.remove(index);
        for (position, list) in self.lists.iter_mut().enumerate() {
            list.position = position;
        }
        let tasks = self.tasks.remove(id).unwrap_or_default();
        Ok((list, tasks))
    }

    fn edit_task(&mut self, id: &TaskId, details: &TaskDetails) -> Result<()> {
        let task = self
            .tasks
            .values_mut()
            .flatten()
            .find(|t| &t.id == id)
            .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })?;
        details.apply_to(task);
        Ok(())
    }

    fn revert(&mut self, before: &BoardSnapshot, revert: &Revert) {
        match revert {
            Revert::Order(containers) => {
                if containers.iter().any(|c| matches!(c, ContainerRef::Board(_))) {
                    self.restore_list_order(before);
                }
                self.restore_task_order(before, containers);
            }
            Revert::Details(id) => {
                let previous = before.task(id);
                let current = self.tasks.values_mut().flatten().find(|t| &t.id == id);
                if let (Some(previous), Some(current)) = (previous, current) {
                    current.title = previous.title.clone();
                    current.description = previous.description.clone();
                    current.due_date = previous.due_date;
                    current.labels = previous.labels.clone();
                    current.assignee = previous.assignee.clone();
                }
            }
            Revert::Task(task) => {
                if self.task(&task.id).is_some() {
                    return;
                }
                if let Some(members) = self.tasks.get_mut(&task.list_id) {
                    let index = task.position.min(members.len());
                    members.insert(index, task.clone());
                    renumber_tasks(members);
                }
            }
            Revert::List { list, tasks } => {
                if self.list(&list.id).is_some() {
                    return;
                }
                let index = list.position.min(self.lists.len());
                self.lists.insert(index, list.clone());
                for (position, list) in self.lists.iter_mut().enumerate() {
                    list.position = position;
                }
                let mut members: Vec<Task> = tasks
                    .iter()
                    .filter(|t| self.task(&t.id).is_none())
                    .cloned()
                    .map(|mut t| {
                        t.list_id = list.id.clone();
                        t
                    })
                    .collect();
                renumber_tasks(&mut members);
                self.tasks.insert(list.id.clone(), members);
            }
        }
    }

    /// Lists known to `before` return to its order; lists created since
    /// follow in their current order
    fn restore_list_order(&mut self, before: &BoardSnapshot) {
        let rank: HashMap<&ListId, usize> =
            before.lists.iter().map(|l| (&l.id, l.position)).collect();
        let mut indexed: Vec<(usize, List)> = self.lists.drain(..).enumerate().collect();
        indexed.sort_by_key(|(index, list)| match rank.get(&list.id) {
            Some(position) => (0, *position, *index),
            None => (1, 0, *index),
        });
        self.lists = indexed.into_iter().map(|(_, list)| list).collect();
        for (position, list) in self.lists.iter_mut().enumerate() {
            list.position = position;
        }
    }

    /// Tasks currently in the given lists return to the list and order they
    /// had in `before`. Tasks that left those lists or were deleted since stay
    /// where they are; tasks added since follow the restored ones.
    fn restore_task_order(&mut self, before: &BoardSnapshot, containers: &[ContainerRef]) {
        let scope: Vec<ListId> = containers
            .iter()
            .filter_map(|c| match c {
                ContainerRef::List(id) if self.tasks.contains_key(id) => Some(id.clone()),
                _ => None,
            })
            .collect();
        if scope.is_empty() {
            return;
        }

        let current: Vec<(ListId, Vec<Task>)> = scope
            .iter()
            .map(|id| (id.clone(), self.tasks.remove(id).unwrap_or_default()))
            .collect();
        let mut pool: HashMap<TaskId, Task> = current
            .iter()
            .flat_map(|(_, members)| members.iter())
            .map(|t| (t.id.clone(), t.clone()))
            .collect();

        let mut restored: HashMap<ListId, Vec<Task>> = scope
            .iter()
            .map(|id| {
                let members = before
                    .tasks_in(id)
                    .iter()
                    .filter_map(|t| pool.remove(&t.id))
                    .map(|mut t| {
                        t.list_id = id.clone();
                        t
                    })
                    .collect();
                (id.clone(), members)
            })
            .collect();

        for (id, members) in current {
            let target = restored.entry(id).or_default();
            target.extend(members.iter().filter_map(|t| pool.remove(&t.id)));
        }
        for (id, mut members) in restored {
            renumber_tasks(&mut members);
            self.tasks.insert(id, members);
        }
    }
}

fn renumber_tasks(members: &mut [Task]) {
    for (position, task) in members.iter_mut().enumerate() {
        task.position = position;
    }
}

/// What to put back into the current snapshot when an operation fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    /// Restore the order (and task membership) these containers had
    Order(Vec<ContainerRef>),
    /// Restore a task's descriptive fields
    Details(TaskId),
    /// Put a removed task back at its old index
    Task(Task),
    /// Put a removed list back at its old index with the tasks still stored
    List { list: List, tasks: Vec<Task> },
}

/// Shared, observable holder of the current [`BoardSnapshot`]
#[derive(Debug)]
pub struct BoardState {
    tx: watch::Sender<Arc<BoardSnapshot>>,
}

impl BoardState {
    pub fn new(snapshot: BoardSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self { tx }
    }

    /// Current snapshot; cheap, immutable, usable as a rollback point
    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.tx.borrow().clone()
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardSnapshot>> {
        self.tx.subscribe()
    }

    /// Apply every batch and reparent of `plan` as one step
    pub fn apply_reorder(&self, plan: &ReorderPlan) -> Result<Arc<BoardSnapshot>> {
        self.update(|snapshot| snapshot.apply_plan(plan))
            .map(|(snapshot, ())| snapshot)
    }

    /// Replace the current state wholesale
    pub fn restore(&self, snapshot: Arc<BoardSnapshot>) {
        self.tx.send_replace(snapshot);
    }

    /// Undo one failed operation against the current state, leaving changes
    /// made by other operations since `before` in place
    pub fn revert(&self, before: &BoardSnapshot, revert: &Revert) -> Result<Arc<BoardSnapshot>> {
        self.update(|snapshot| {
            snapshot.revert(before, revert);
            Ok(())
        })
        .map(|(snapshot, ())| snapshot)
    }

    pub(crate) fn insert_list(&self, list: List) -> Result<Arc<BoardSnapshot>> {
        self.update(|snapshot| snapshot.push_list(list))
            .map(|(snapshot, ())| snapshot)
    }

    pub(crate) fn insert_task(&self, task: Task) -> Result<Arc<BoardSnapshot>> {
        self.update(|snapshot| snapshot.push_task(task))
            .map(|(snapshot, ())| snapshot)
    }

    pub(crate) fn remove_task(&self, id: &TaskId) -> Result<(Arc<BoardSnapshot>, Task)> {
        self.update(|snapshot| snapshot.remove_task(id))
    }

    pub(crate) fn remove_list(&self, id: &ListId) -> Result<(Arc<BoardSnapshot>, (List, Vec<Task>))> {
        self.update(|snapshot| snapshot.remove_list(id))
    }

    pub(crate) fn edit_task(&self, id: &TaskId, details: &TaskDetails) -> Result<Arc<BoardSnapshot>> {
        self.update(|snapshot| snapshot.edit_task(id, details))
            .map(|(snapshot, ())| snapshot)
    }

    /// Clone, mutate, verify, publish. Nothing is published on error.
    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut BoardSnapshot) -> Result<T>,
    ) -> Result<(Arc<BoardSnapshot>, T)> {
        let mut outcome = None;
        self.tx.send_if_modified(|current| {
            let mut next = BoardSnapshot::clone(current);
            let result = mutate(&mut next).and_then(|value| {
                next.check_invariants()?;
                Ok(value)
            });
            match result {
                Ok(value) => {
                    let next = Arc::new(next);
                    *current = Arc::clone(&next);
                    outcome = Some(Ok((next, value)));
                    true
                }
                Err(error) => {
                    outcome = Some(Err(error));
                    false
                }
            }
        });
        outcome.unwrap_or_else(|| Err(BoardError::invariant("state update did not run")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reorder::{self, Gesture};
    use crate::types::{BoardId, NewBoard};

    /// Board `b1` with lists `l1` (t1, t2, t3) and `l2` (t4, t5)
    pub(crate) fn sample_snapshot() -> BoardSnapshot {
        let board_id = BoardId::from_string("b1");
        let board = NewBoard::new("Sample").into_board(board_id.clone());
        let lists = ["l1", "l2"]
            .iter()
            .enumerate()
            .map(|(position, id)| List {
                id: ListId::from_string(*id),
                board_id: board_id.clone(),
                title: id.to_uppercase(),
                position,
            })
            .collect();
        let layout: [(&str, &[&str]); 2] = [("l1", &["t1", "t2", "t3"]), ("l2", &["t4", "t5"])];
        let tasks = layout
            .iter()
            .flat_map(|(list, ids)| {
                ids.iter().enumerate().map(move |(position, id)| Task {
                    id: TaskId::from_string(*id),
                    list_id: ListId::from_string(*list),
                    title: format!("Task {}", id),
                    description: None,
                    due_date: None,
                    labels: Vec::new(),
                    assignee: None,
                    position,
                })
            })
            .collect();
        BoardSnapshot::new(board, lists, tasks).unwrap()
    }

    fn ids(snapshot: &BoardSnapshot, list: &str) -> Vec<String> {
        snapshot
            .tasks_in(&ListId::from_string(list))
            .iter()
            .map(|t| t.id.to_string())
            .collect()
    }

    #[test]
    fn test_sample_is_consistent() {
        let snapshot = sample_snapshot();
        assert!(snapshot.check_invariants().is_ok());
        assert_eq!(snapshot.task_count(), 5);
        assert_eq!(ids(&snapshot, "l1"), ["t1", "t2", "t3"]);
    }

    #[test]
    fn test_new_rejects_gaps() {
        let snapshot = sample_snapshot();
        let mut tasks: Vec<Task> = snapshot.tasks().cloned().collect();
        tasks[1].position = 5;
        let result = BoardSnapshot::new(
            snapshot.board().clone(),
            snapshot.lists().to_vec(),
            tasks,
        );
        assert!(matches!(result, Err(BoardError::Invariant { .. })));
    }

    #[test]
    fn test_from_records_renumbers_gaps_and_keeps_order() {
        let snapshot = sample_snapshot();
        let mut tasks: Vec<Task> = snapshot.tasks().cloned().collect();
        // l1 stored as t1=0, t2=7, t3=3 -> order t1, t3, t2
        tasks[1].position = 7;
        tasks[2].position = 3;

        let (normalized, renumbered) = BoardSnapshot::from_records(
            snapshot.board().clone(),
            snapshot.lists().to_vec(),
            tasks,
        )
        .unwrap();

        assert_eq!(ids(&normalized, "l1"), ["t1", "t3", "t2"]);
        assert_eq!(renumbered, vec![ContainerRef::List(ListId::from_string("l1"))]);
        assert!(normalized.check_invariants().is_ok());
    }

    #[test]
    fn test_from_records_rejects_foreign_task() {
        let snapshot = sample_snapshot();
        let mut tasks: Vec<Task> = snapshot.tasks().cloned().collect();
        tasks[0].list_id = ListId::from_string("elsewhere");
        let result = BoardSnapshot::from_records(
            snapshot.board().clone(),
            snapshot.lists().to_vec(),
            tasks,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_reorder_publishes_whole_plan() {
        let state = BoardState::new(sample_snapshot());
        let mut rx = state.subscribe();
        let before = state.snapshot();

        let gesture = Gesture::task("t1", "l1", 0, "l2", 1);
        let plan = reorder::plan(&before, &gesture).unwrap().unwrap();
        let after = state.apply_reorder(&plan).unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen, after);
        assert_eq!(ids(&after, "l1"), ["t2", "t3"]);
        assert_eq!(ids(&after, "l2"), ["t4", "t1", "t5"]);
        // The captured rollback point is untouched
        assert_eq!(ids(&before, "l1"), ["t1", "t2", "t3"]);
    }

    #[test]
    fn test_stale_plan_is_rejected_without_publishing() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let plan = reorder::plan(&before, &Gesture::task("t1", "l1", 0, "l1", 2))
            .unwrap()
            .unwrap();

        state.remove_task(&TaskId::from_string("t2")).unwrap();
        let after_removal = state.snapshot();
        let mut rx = state.subscribe();

        assert!(state.apply_reorder(&plan).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(state.snapshot(), after_removal);
    }

    #[test]
    fn test_restore_replaces_state() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let plan = reorder::plan(&before, &Gesture::list("l2", "b1", 1, 0))
            .unwrap()
            .unwrap();
        state.apply_reorder(&plan).unwrap();
        assert_ne!(state.snapshot(), before);

        state.restore(Arc::clone(&before));
        assert_eq!(*state.snapshot(), *before);
    }

    #[test]
    fn test_revert_order_keeps_later_changes_elsewhere() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let first = reorder::plan(&before, &Gesture::task("t1", "l1", 0, "l1", 2))
            .unwrap()
            .unwrap();
        state.apply_reorder(&first).unwrap();
        let second = reorder::plan(&state.snapshot(), &Gesture::list("l2", "b1", 1, 0))
            .unwrap()
            .unwrap();
        state.apply_reorder(&second).unwrap();

        let reverted = state.revert(&before, &Revert::Order(first.containers())).unwrap();
        assert_eq!(ids(&reverted, "l1"), ["t1", "t2", "t3"]);
        assert_eq!(reverted.list_ids(), [ListId::from_string("l2"), ListId::from_string("l1")]);
    }

    #[test]
    fn test_revert_cross_list_move_keeps_new_arrivals() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let plan = reorder::plan(&before, &Gesture::task("t1", "l1", 0, "l2", 0))
            .unwrap()
            .unwrap();
        state.apply_reorder(&plan).unwrap();
        let late = crate::types::NewTask::new("Late").into_task(
            TaskId::from_string("t6"),
            ListId::from_string("l2"),
            0,
        );
        state.insert_task(late).unwrap();

        let reverted = state.revert(&before, &Revert::Order(plan.containers())).unwrap();
        assert_eq!(ids(&reverted, "l1"), ["t1", "t2", "t3"]);
        assert_eq!(ids(&reverted, "l2"), ["t4", "t5", "t6"]);
        assert_eq!(reverted.task(&TaskId::from_string("t1")).unwrap().list_id.as_str(), "l1");
    }

    #[test]
    fn test_revert_list_removal_with_surviving_tasks() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let (_, (list, tasks)) = state.remove_list(&ListId::from_string("l1")).unwrap();
        let survivors = tasks.into_iter().filter(|t| t.id.as_str() != "t1").collect();

        let reverted = state
            .revert(&before, &Revert::List { list, tasks: survivors })
            .unwrap();
        assert_eq!(reverted.lists()[0].id.as_str(), "l1");
        assert_eq!(ids(&reverted, "l1"), ["t2", "t3"]);
        assert_eq!(reverted.tasks_in(&ListId::from_string("l1"))[0].position, 0);
    }

    #[test]
    fn test_revert_details_and_removed_task() {
        let state = BoardState::new(sample_snapshot());
        let before = state.snapshot();
        let t2 = TaskId::from_string("t2");
        state
            .edit_task(&t2, &TaskDetails::new().with_title("Renamed"))
            .unwrap();
        let (_, removed) = state.remove_task(&TaskId::from_string("t1")).unwrap();

        state.revert(&before, &Revert::Details(t2.clone())).unwrap();
        let reverted = state.revert(&before, &Revert::Task(removed)).unwrap();
        assert_eq!(*reverted, *before);
    }

    #[test]
    fn test_remove_task_compacts_siblings() {
        let state = BoardState::new(sample_snapshot());
        let (after, removed) = state.remove_task(&TaskId::from_string("t1")).unwrap();
        assert_eq!(removed.id.as_str(), "t1");
        let positions: Vec<usize> = after
            .tasks_in(&ListId::from_string("l1"))
            .iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, [0, 1]);
    }

    #[test]
    fn test_remove_list_takes_tasks_and_compacts_lists() {
        let state = BoardState::new(sample_snapshot());
        let (after, (list, tasks)) = state.remove_list(&ListId::from_string("l1")).unwrap();
        assert_eq!(list.id.as_str(), "l1");
        assert_eq!(tasks.len(), 3);
        assert_eq!(after.lists().len(), 1);
        assert_eq!(after.lists()[0].position, 0);
        assert!(after.task(&TaskId::from_string("t1")).is_none());
    }

    #[test]
    fn test_edit_task_keeps_order() {
        let state = BoardState::new(sample_snapshot());
        let after = state
            .edit_task(
                &TaskId::from_string("t2"),
                &TaskDetails::new().with_title("Renamed"),
            )
            .unwrap();
        let task = after.task(&TaskId::from_string("t2")).unwrap();
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.position, 1);
    }

    #[test]
    fn test_insert_task_into_unknown_list_fails() {
        let state = BoardState::new(sample_snapshot());
        let task = crate::types::NewTask::new("Orphan").into_task(
            TaskId::new(),
            ListId::from_string("missing"),
            0,
        );
        assert!(matches!(
            state.insert_task(task),
            Err(BoardError::ListNotFound { .. })
        ));
    }
}

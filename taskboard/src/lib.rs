//! Taskboard - ordered multi-container reordering for kanban boards
//!
//! A board orders its lists, and each list orders its tasks, by dense
//! zero-based positions. Drag gestures are planned into whole-container
//! rankings, applied optimistically to an observable in-memory snapshot, and
//! persisted to a [`store::RecordStore`] in the background. A failed write
//! reverts what that operation changed, leaving later operations in place.
//!
//! ## Modules
//!
//! - [`position`] - dense ranking primitives
//! - [`reorder`] - gesture to [`reorder::ReorderPlan`]
//! - [`state`] - the optimistic [`state::BoardState`]
//! - [`sync`] - background persistence with rollback
//! - [`gesture`] - raw drag-end events
//! - [`store`] - record store trait and backends
//! - [`session`] - [`BoardSession`], the entry point for a UI
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard::store::MemoryRecordStore;
//! use taskboard::types::{NewBoard, NewTask};
//! use taskboard::BoardSession;
//! use taskboard_config::SyncSettings;
//!
//! # async fn demo() -> taskboard::Result<()> {
//! let store = Arc::new(MemoryRecordStore::new());
//! let settings = SyncSettings::default();
//! let board = BoardSession::create_board(store.as_ref(), NewBoard::new("Launch"), &settings).await?;
//! let session = BoardSession::load(store, &board.id, settings).await?;
//!
//! let snapshot = session.add_list("Todo").await?;
//! let todo = snapshot.lists()[0].id.clone();
//! session.add_task(&todo, NewTask::new("Write changelog")).await?;
//!
//! let applied = session.on_drag_end_json(
//!     r#"{"draggableId": "...", "type": "task",
//!         "source": {"droppableId": "...", "index": 0},
//!         "destination": {"droppableId": "...", "index": 0}}"#,
//! )?;
//! let settled = applied.settle().await?;
//! # let _ = settled;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gesture;
pub mod position;
pub mod reorder;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{BoardError, Result, StoreError, StoreResult};
pub use gesture::{DragEnd, DragLocation, DropReason};
pub use position::{Endpoint, PositionError};
pub use reorder::{Gesture, ReorderPlan, Slot};
pub use session::BoardSession;
pub use state::{BoardSnapshot, BoardState, Revert};
pub use store::{EntityKind, FileRecordStore, MemoryRecordStore, RecordKey, RecordStore};
pub use sync::{Applied, PendingSync, Settlement, SyncNotice, SyncOperation, Synchronizer};

//! Core types for the board engine

mod board;
mod ids;
mod task;

pub use board::{Board, ContainerKind, ContainerRef, List, NewBoard, NewList, DEFAULT_BACKGROUND};
pub use ids::{BoardId, ListId, TaskId};
pub use task::{NewTask, Task, TaskDetails};

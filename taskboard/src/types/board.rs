//! Board-level types: Board, List, container kinds

use super::ids::{BoardId, ListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default board background, matching the dashboard's first swatch
pub const DEFAULT_BACKGROUND: &str = "#3B82F6";

/// A board - just metadata. Lists are separate records that point back at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub background_color: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a board; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBoard {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub background_color: String,
}

impl NewBoard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            background_color: DEFAULT_BACKGROUND.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = color.into();
        self
    }

    /// Materialize with a store-assigned id
    pub fn into_board(self, id: BoardId) -> Board {
        Board {
            id,
            title: self.title,
            description: self.description,
            background_color: self.background_color,
            created_at: Utc::now(),
        }
    }
}

/// A list is one column of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub title: String,
    /// Dense zero-based rank among the board's lists
    pub position: usize,
}

/// Fields supplied when creating a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewList {
    pub board_id: BoardId,
    pub title: String,
    pub position: usize,
}

impl NewList {
    pub fn into_list(self, id: ListId) -> List {
        List {
            id,
            board_id: self.board_id,
            title: self.title,
            position: self.position,
        }
    }
}

/// What a drag gesture moves: a whole list within the board, or a task
/// within or between lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    List,
    Task,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Task => f.write_str("task"),
        }
    }
}

/// A container whose members carry dense positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ContainerRef {
    /// The board, ordering its lists
    Board(BoardId),
    /// A list, ordering its tasks
    List(ListId),
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(id) => write!(f, "board:{}", id),
            Self::List(id) => write!(f, "list:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_defaults() {
        let board = NewBoard::new("Roadmap").into_board(BoardId::from_string("b1"));
        assert_eq!(board.title, "Roadmap");
        assert_eq!(board.background_color, DEFAULT_BACKGROUND);
        assert!(board.description.is_none());
    }

    #[test]
    fn test_container_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ContainerKind::List).unwrap(), "\"list\"");
        let kind: ContainerKind = serde_json::from_str("\"task\"").unwrap();
        assert_eq!(kind, ContainerKind::Task);
    }

    #[test]
    fn test_container_ref_display() {
        let list = ContainerRef::List(ListId::from_string("l1"));
        assert_eq!(list.to_string(), "list:l1");
        let board = ContainerRef::Board(BoardId::from_string("b1"));
        assert_eq!(board.to_string(), "board:b1");
    }
}

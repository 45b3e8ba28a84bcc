//! Drag gesture adapter.
//!
//! Translates the drag-end event emitted by the UI's drag library into a
//! [`Gesture`]. Drops outside any container and cancelled drags produce no
//! gesture, so the reorder engine is never invoked for them.

use crate::error::{BoardError, Result};
use crate::reorder::{Gesture, Slot};
use crate::types::ContainerKind;
use serde::{Deserialize, Serialize};

/// Why the drag ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DropReason {
    #[default]
    Drop,
    Cancel,
}

/// A droppable container and an index inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub droppable_id: String,
    pub index: usize,
}

/// Raw drag-end event
///
/// ```json
/// {
///   "draggableId": "t1",
///   "type": "task",
///   "source": { "droppableId": "l1", "index": 0 },
///   "destination": { "droppableId": "l2", "index": 1 },
///   "reason": "DROP"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragEnd {
    pub draggable_id: String,
    #[serde(rename = "type")]
    pub kind: ContainerKind,
    pub source: DragLocation,
    #[serde(default)]
    pub destination: Option<DragLocation>,
    #[serde(default)]
    pub reason: DropReason,
}

impl DragEnd {
    /// Parse an event; malformed input is an invalid gesture
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BoardError::invalid_gesture(format!("malformed drag event: {}", e)))
    }

    /// The gesture this event describes, if it landed anywhere
    pub fn into_gesture(self) -> Option<Gesture> {
        if self.reason == DropReason::Cancel {
            return None;
        }
        let destination = self.destination?;
        Some(Gesture {
            kind: self.kind,
            moved_id: self.draggable_id,
            source: Slot::new(self.source.droppable_id, self.source.index),
            destination: Slot::new(destination.droppable_id, destination.index),
        })
    }
}

/// Translate an event delivered to a handler that only accepts `expected`
pub fn translate(event: DragEnd, expected: ContainerKind) -> Result<Option<Gesture>> {
    if event.kind != expected {
        return Err(BoardError::invalid_gesture(format!(
            "expected a {} drag, got a {} drag",
            expected, event.kind
        )));
    }
    Ok(event.into_gesture())
}

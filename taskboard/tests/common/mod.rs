//! Shared fixtures for board integration tests

#![allow(dead_code)]

use std::sync::Arc;
use taskboard::store::{EntityKind, MemoryRecordStore, RecordKey, RecordStore};
use taskboard::types::{ListId, NewBoard, NewTask, TaskId};
use taskboard::BoardSession;
use taskboard_config::SyncSettings;

/// A board built through the session API on an in-memory store
pub struct Fixture {
    pub store: Arc<MemoryRecordStore>,
    pub session: BoardSession,
}

impl Fixture {
    /// `layout` is `(list title, task titles)` in board order
    pub async fn new(layout: &[(&str, &[&str])]) -> Self {
        Self::with_settings(layout, SyncSettings::default()).await
    }

    pub async fn with_settings(layout: &[(&str, &[&str])], settings: SyncSettings) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let board = BoardSession::create_board(store.as_ref(), NewBoard::new("Fixture"), &settings)
            .await
            .unwrap();
        let session = BoardSession::load(store.clone(), &board.id, settings)
            .await
            .unwrap();

        for (list_title, task_titles) in layout {
            let snapshot = session.add_list(*list_title).await.unwrap();
            let list = snapshot.lists().last().unwrap().id.clone();
            for title in *task_titles {
                session.add_task(&list, NewTask::new(*title)).await.unwrap();
            }
        }

        store.clear_calls().await;
        Self { store, session }
    }

    pub fn board(&self) -> String {
        self.session.board_id().to_string()
    }

    pub fn list(&self, title: &str) -> ListId {
        self.session
            .snapshot()
            .lists()
            .iter()
            .find(|l| l.title == title)
            .map(|l| l.id.clone())
            .unwrap_or_else(|| panic!("no list titled {}", title))
    }

    pub fn task(&self, title: &str) -> TaskId {
        self.session
            .snapshot()
            .tasks()
            .find(|t| t.title == title)
            .map(|t| t.id.clone())
            .unwrap_or_else(|| panic!("no task titled {}", title))
    }

    /// List titles in board order
    pub fn list_titles(&self) -> Vec<String> {
        self.session
            .snapshot()
            .lists()
            .iter()
            .map(|l| l.title.clone())
            .collect()
    }

    /// `(title, position)` of a list's tasks in the current snapshot
    pub fn tasks_of(&self, list_title: &str) -> Vec<(String, usize)> {
        let list = self.list(list_title);
        self.session
            .snapshot()
            .tasks_in(&list)
            .iter()
            .map(|t| (t.title.clone(), t.position))
            .collect()
    }

    /// `(title, position)` of a list's tasks as the store holds them
    pub async fn stored_tasks_of(&self, list: &ListId) -> Vec<(String, usize)> {
        self.store
            .fetch_many(EntityKind::Task, list.as_str())
            .await
            .unwrap()
            .into_iter()
            .map(|r| {
                let task = r.into_task().unwrap();
                (task.title, task.position)
            })
            .collect()
    }

    /// `(title, position)` of the board's lists as the store holds them
    pub async fn stored_lists(&self) -> Vec<(String, usize)> {
        self.store
            .fetch_many(EntityKind::List, &self.board())
            .await
            .unwrap()
            .into_iter()
            .map(|r| {
                let list = r.into_list().unwrap();
                (list.title, list.position)
            })
            .collect()
    }

    pub async fn stored_task(&self, id: &TaskId) -> Option<taskboard::types::Task> {
        self.store
            .peek(&RecordKey::task(id))
            .await
            .map(|r| r.into_task().unwrap())
    }
}

pub fn pairs(expected: &[(&str, usize)]) -> Vec<(String, usize)> {
    expected.iter().map(|(t, p)| (t.to_string(), *p)).collect()
}

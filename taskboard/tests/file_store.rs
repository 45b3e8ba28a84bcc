//! Board sessions over the file-backed store

use std::sync::Arc;
use taskboard::store::{FileRecordStore, RecordKey, RecordStore};
use taskboard::types::{BoardId, ContainerRef, NewBoard, NewTask};
use taskboard::BoardSession;
use taskboard_config::{StoreBackend, StoreSettings, SyncSettings};
use tempfile::TempDir;

async fn open(temp: &TempDir) -> Arc<dyn RecordStore> {
    Arc::new(FileRecordStore::open(temp.path().join("data")).await.unwrap())
}

fn titles(session: &BoardSession, list: usize) -> Vec<String> {
    let snapshot = session.snapshot();
    let id = snapshot.lists()[list].id.clone();
    snapshot.tasks_in(&id).iter().map(|t| t.title.clone()).collect()
}

async fn seeded(temp: &TempDir) -> BoardId {
    let store = open(temp).await;
    let settings = SyncSettings::default();
    let board = BoardSession::create_board(store.as_ref(), NewBoard::new("Files"), &settings)
        .await
        .unwrap();
    let session = BoardSession::load(store, &board.id, settings).await.unwrap();
    let snapshot = session.add_list("Todo").await.unwrap();
    let todo = snapshot.lists()[0].id.clone();
    session.add_list("Done").await.unwrap();
    for title in ["one", "two", "three"] {
        session.add_task(&todo, NewTask::new(title)).await.unwrap();
    }
    board.id
}

#[tokio::test]
async fn test_order_survives_reload() {
    let temp = TempDir::new().unwrap();
    let board_id = seeded(&temp).await;

    let session = BoardSession::load(open(&temp).await, &board_id, SyncSettings::default())
        .await
        .unwrap();
    let snapshot = session.snapshot();
    let done = snapshot.lists()[1].id.clone();
    let three = snapshot.tasks().find(|t| t.title == "three").unwrap().id.clone();
    session.move_task(&three, &done, 0).unwrap().settle().await.unwrap();
    let one = session.snapshot().tasks().find(|t| t.title == "one").unwrap().id.clone();
    session.move_task(&one, &snapshot.lists()[0].id, 1).unwrap().settle().await.unwrap();

    let reloaded = BoardSession::load(open(&temp).await, &board_id, SyncSettings::default())
        .await
        .unwrap();
    assert_eq!(titles(&reloaded, 0), ["two", "one"]);
    assert_eq!(titles(&reloaded, 1), ["three"]);
    assert_eq!(reloaded.snapshot().lists(), session.snapshot().lists());
}

#[tokio::test]
async fn test_loader_normalizes_gaps_and_marks_dirty() {
    let temp = TempDir::new().unwrap();
    let board_id = seeded(&temp).await;
    let store = FileRecordStore::open(temp.path().join("data")).await.unwrap();

    // Hand-edit "two" to position 9, leaving a gap at 1
    let session = BoardSession::load(open(&temp).await, &board_id, SyncSettings::default())
        .await
        .unwrap();
    let two = session.snapshot().tasks().find(|t| t.title == "two").unwrap().clone();
    let path = store.record_path(&RecordKey::task(&two.id));
    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    value["position"] = serde_json::json!(9);
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    let session = BoardSession::load(open(&temp).await, &board_id, SyncSettings::default())
        .await
        .unwrap();
    assert_eq!(titles(&session, 0), ["one", "three", "two"]);
    let positions: Vec<usize> = session
        .snapshot()
        .tasks_in(&two.list_id)
        .iter()
        .map(|t| t.position)
        .collect();
    assert_eq!(positions, [0, 1, 2]);
    assert!(session.is_dirty(&ContainerRef::List(two.list_id.clone())));
}

#[tokio::test]
async fn test_open_from_settings() {
    let temp = TempDir::new().unwrap();
    let settings = StoreSettings {
        backend: StoreBackend::File,
        root: temp.path().join("configured"),
    };
    let store = taskboard::store::open(&settings).await.unwrap();
    BoardSession::create_board(store.as_ref(), NewBoard::new("Configured"), &SyncSettings::default())
        .await
        .unwrap();
    assert!(temp.path().join("configured").join("boards").is_dir());

    let memory = taskboard::store::open(&StoreSettings {
        backend: StoreBackend::Memory,
        ..Default::default()
    })
    .await
    .unwrap();
    assert!(memory
        .fetch_many(taskboard::store::EntityKind::Board, "")
        .await
        .unwrap()
        .is_empty());
}

//! Deletes: remote ordering, rollback and compaction

mod common;

use common::{pairs, Fixture};
use taskboard::store::{EntityKind, RecordKey, StoreCall};
use taskboard::types::ContainerRef;
use taskboard::{BoardError, SyncOperation};

const BOARD: &[(&str, &[&str])] = &[
    ("Todo", &["a", "b", "c"]),
    ("Doing", &["d"]),
    ("Done", &["e", "f"]),
];

#[test_log::test(tokio::test)]
async fn test_list_tasks_are_deleted_before_the_list() {
    let fx = Fixture::new(BOARD).await;
    let todo = fx.list("Todo");

    let applied = fx.session.delete_list(&todo).unwrap();
    assert_eq!(fx.list_titles(), ["Doing", "Done"]);
    applied.settle().await.unwrap();

    let writes = fx.store.writes().await;
    let deletes: Vec<&StoreCall> = writes
        .iter()
        .filter(|c| matches!(c, StoreCall::Delete(_)))
        .collect();
    assert_eq!(deletes.len(), 4);
    for call in &deletes[..3] {
        assert!(matches!(call, StoreCall::Delete(key) if key.kind == EntityKind::Task));
    }
    assert_eq!(*deletes[3], StoreCall::Delete(RecordKey::list(&todo)));

    // Doing and Done shift left remotely too
    assert_eq!(fx.stored_lists().await, pairs(&[("Doing", 0), ("Done", 1)]));
}

#[test_log::test(tokio::test)]
async fn test_task_delete_failure_keeps_the_list() {
    let fx = Fixture::new(BOARD).await;
    let todo = fx.list("Todo");
    let b = fx.task("b");
    fx.store.fail_delete(RecordKey::task(&b)).await;
    let before = fx.session.snapshot();
    let mut notices = fx.session.notifications();

    let err = fx
        .session
        .delete_list(&todo)
        .unwrap()
        .settle()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::RemoteWriteFailure {
            operation: SyncOperation::DeleteList,
            ..
        }
    ));

    assert!(!fx
        .store
        .writes()
        .await
        .contains(&StoreCall::Delete(RecordKey::list(&todo))));
    assert!(fx.store.peek(&RecordKey::list(&todo)).await.is_some());

    // "a" was deleted before "b" failed, so only "b" and "c" come back
    assert_eq!(fx.list_titles(), ["Todo", "Doing", "Done"]);
    assert_eq!(fx.tasks_of("Todo"), pairs(&[("b", 0), ("c", 1)]));
    assert_eq!(fx.session.snapshot().lists(), before.lists());
    assert!(fx.session.is_dirty(&ContainerRef::List(todo.clone())));

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.operation, SyncOperation::DeleteList);
    assert!(notice.rolled_back);

    // The stored gap left by "a" is repaired by the next write
    fx.store.heal().await;
    let c = fx.task("c");
    fx.session.move_task(&c, &todo, 0).unwrap().settle().await.unwrap();
    assert_eq!(fx.stored_tasks_of(&todo).await, pairs(&[("c", 0), ("b", 1)]));
}

#[test_log::test(tokio::test)]
async fn test_list_delete_failure_rolls_back() {
    let fx = Fixture::new(BOARD).await;
    let doing = fx.list("Doing");
    fx.store.fail_delete(RecordKey::list(&doing)).await;

    assert!(fx
        .session
        .delete_list(&doing)
        .unwrap()
        .settle()
        .await
        .is_err());

    // The list comes back without "d", which is gone from the store
    assert_eq!(fx.list_titles(), ["Todo", "Doing", "Done"]);
    assert!(fx.tasks_of("Doing").is_empty());
    assert!(fx.stored_tasks_of(&doing).await.is_empty());
    assert!(fx.store.peek(&RecordKey::list(&doing)).await.is_some());
}

#[test_log::test(tokio::test)]
async fn test_list_restored_after_failed_delete_accepts_moves() {
    let fx = Fixture::new(BOARD).await;
    let doing = fx.list("Doing");
    fx.store.fail_delete(RecordKey::list(&doing)).await;
    assert!(fx
        .session
        .delete_list(&doing)
        .unwrap()
        .settle()
        .await
        .is_err());
    fx.store.heal().await;

    let a = fx.task("a");
    fx.session.move_task(&a, &doing, 0).unwrap().settle().await.unwrap();
    assert_eq!(fx.tasks_of("Doing"), pairs(&[("a", 0)]));
    assert_eq!(fx.stored_tasks_of(&doing).await, pairs(&[("a", 0)]));
    assert_eq!(fx.stored_tasks_of(&fx.list("Todo")).await, pairs(&[("b", 0), ("c", 1)]));
}

#[test_log::test(tokio::test)]
async fn test_delete_task_compacts_siblings() {
    let fx = Fixture::new(BOARD).await;
    let todo = fx.list("Todo");
    let a = fx.task("a");

    let applied = fx.session.delete_task(&a).unwrap();
    assert_eq!(fx.tasks_of("Todo"), pairs(&[("b", 0), ("c", 1)]));
    applied.settle().await.unwrap();

    assert_eq!(fx.stored_tasks_of(&todo).await, pairs(&[("b", 0), ("c", 1)]));
    let writes = fx.store.writes().await;
    assert_eq!(writes[0], StoreCall::Delete(RecordKey::task(&a)));
    assert_eq!(writes.len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_deleting_last_task_writes_no_compaction() {
    let fx = Fixture::new(BOARD).await;
    let c = fx.task("c");

    fx.session.delete_task(&c).unwrap().settle().await.unwrap();
    assert_eq!(
        fx.store.writes().await,
        vec![StoreCall::Delete(RecordKey::task(&c))]
    );
}

#[test_log::test(tokio::test)]
async fn test_failed_task_delete_restores_it() {
    let fx = Fixture::new(BOARD).await;
    let b = fx.task("b");
    fx.store.fail_delete(RecordKey::task(&b)).await;
    let before = fx.session.snapshot();

    let err = fx
        .session
        .delete_task(&b)
        .unwrap()
        .settle()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::RemoteWriteFailure {
            operation: SyncOperation::DeleteTask,
            ..
        }
    ));
    assert_eq!(fx.session.snapshot(), before);
    assert_eq!(fx.store.writes().await.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_compaction_failure_keeps_the_delete() {
    let fx = Fixture::new(BOARD).await;
    let todo = fx.list("Todo");
    let (a, c) = (fx.task("a"), fx.task("c"));
    fx.store.fail_update(RecordKey::task(&c)).await;
    let mut notices = fx.session.notifications();

    let settled = fx.session.delete_task(&a).unwrap().settle().await.unwrap();
    assert!(settled.task(&a).is_none());
    assert_eq!(fx.tasks_of("Todo"), pairs(&[("b", 0), ("c", 1)]));
    assert!(fx.store.peek(&RecordKey::task(&a)).await.is_none());

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.operation, SyncOperation::DeleteTask);
    assert!(!notice.rolled_back);
    assert!(fx.session.is_dirty(&ContainerRef::List(todo.clone())));

    // The next write to the list repairs every row
    fx.store.heal().await;
    let b = fx.task("b");
    fx.session
        .move_task(&b, &todo, 1)
        .unwrap()
        .settle()
        .await
        .unwrap();
    assert_eq!(fx.stored_tasks_of(&todo).await, pairs(&[("c", 0), ("b", 1)]));
    assert!(!fx.session.is_dirty(&ContainerRef::List(todo)));
}

#[test_log::test(tokio::test)]
async fn test_delete_unknown_task_is_rejected_locally() {
    let fx = Fixture::new(BOARD).await;
    let result = fx.session.delete_task(&"missing".into());
    assert!(matches!(result, Err(BoardError::TaskNotFound { .. })));
    assert!(fx.store.calls().await.is_empty());
}

use rusqlite::params;
use taskflow::config::Config;
use taskflow::engine::db::Db;
use taskflow::engine::error::{PersistenceError, ServiceError};
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, Role, TaskService};
use taskflow::engine::state;
use taskflow::engine::store::TaskStore;
use taskflow::engine::types::{SubtaskStatus, TaskStatus};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("nested").join("state.db");
    Db::init(&path).unwrap();
    SqliteStore::open(&path).unwrap()
}

fn admin() -> AuthContext {
    AuthContext::new("admin", Role::Admin)
}

#[test]
fn test_connect_requires_init() {
    let dir = TempDir::new().unwrap();
    let err = SqliteStore::open(&dir.path().join("missing.db")).err().unwrap();
    assert!(matches!(err, PersistenceError::NotInitialized(_)));
}

#[test]
fn test_checklist_workflow_persists() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let auth = AuthContext::new("dana", Role::Employee);

    let id = svc.create_task(&auth, "Quarterly report").unwrap();
    svc.add_subtask(&auth, id, "collect numbers").unwrap();
    svc.add_subtask(&auth, id, "write summary").unwrap();
    let ids = svc.snapshot(id).unwrap().subtask_ids();
    assert_eq!(ids.len(), 2);

    svc.toggle_subtask(&auth, id, ids[0]).unwrap();
    let (after, changes) = svc.toggle_subtask(&auth, id, ids[1]).unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(after.task.status, TaskStatus::Done);
    assert_eq!(svc.snapshot(id).unwrap(), after);

    let (after, changes) = svc
        .set_subtask_status(&auth, id, ids[0], SubtaskStatus::Pending)
        .unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(after.task.status, TaskStatus::InProgress);
    assert_eq!(svc.snapshot(id).unwrap(), after);
}

#[test]
fn test_subtask_order_is_insertion_order() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let id = svc.create_task(&admin(), "Ordered").unwrap();
    for title in ["one", "two", "three"] {
        svc.add_subtask(&admin(), id, title).unwrap();
    }
    let titles: Vec<_> = svc
        .snapshot(id)
        .unwrap()
        .subtasks
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
}

#[test]
fn test_stale_write_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let id = store.create_task("Race").unwrap();

    let base = store.load_snapshot(id).unwrap();
    let (_, changes) = state::add_subtask(&base, 1, "a").unwrap();
    store.apply_changes(&base, &changes, "setup").unwrap();
    let base = store.load_snapshot(id).unwrap();
    let (_, changes) = state::add_subtask(&base, 2, "b").unwrap();
    store.apply_changes(&base, &changes, "setup").unwrap();

    let stale = store.load_snapshot(id).unwrap();
    let (_, mine) = state::toggle_subtask(&stale, 2).unwrap();
    let (_, theirs) = state::toggle_subtask(&stale, 1).unwrap();
    store.apply_changes(&stale, &theirs, "them").unwrap();
    let committed = store.load_snapshot(id).unwrap();

    let err = store.apply_changes(&stale, &mine, "me").unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.load_snapshot(id).unwrap(), committed);
    assert_eq!(store.history(Some(id), 50).unwrap()[0].actor, "them");
}

#[test]
fn test_history_records_changes() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let id = svc.create_task(&admin(), "Audit").unwrap();
    svc.add_subtask(&admin(), id, "a").unwrap();
    svc.add_subtask(&admin(), id, "b").unwrap();
    svc.set_task_status(&admin(), id, TaskStatus::Done).unwrap();

    let history = svc.history(Some(id), 10).unwrap();
    assert_eq!(history.len(), 5);
    let newest = &history[0];
    assert_eq!(newest.entity, "task");
    assert_eq!(newest.field, "status");
    assert_eq!(newest.old_value.as_deref(), Some("to_do"));
    assert_eq!(newest.new_value.as_deref(), Some("done"));
    assert_eq!(history[4].field, "existence");
    assert_eq!(history[4].old_value, None);

    assert_eq!(svc.history(None, 2).unwrap().len(), 2);
}

#[test]
fn test_legacy_statuses_are_normalized() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    store
        .conn()
        .execute(
            "INSERT INTO tasks (id, title, status) VALUES (1, 'old', 'completed')",
            [],
        )
        .unwrap();
    for (id, status) in [(10, "completed"), (11, "to_do")] {
        store
            .conn()
            .execute(
                "INSERT INTO subtasks (id, task_id, title, status, position) VALUES (?1, 1, 'x', ?2, ?1)",
                params![id, status],
            )
            .unwrap();
    }

    let snap = store.load_snapshot(1).unwrap();
    assert_eq!(snap.task.status, TaskStatus::Done);
    assert_eq!(snap.subtask(10).unwrap().status, SubtaskStatus::Done);
    assert_eq!(snap.subtask(11).unwrap().status, SubtaskStatus::Pending);

    let (_, changes) = state::set_task_status(&snap, TaskStatus::Done).unwrap();
    store.apply_changes(&snap, &changes, "fixer").unwrap();

    let raw: String = store
        .conn()
        .query_row("SELECT status FROM subtasks WHERE id = 11", [], |r| r.get(0))
        .unwrap();
    assert_eq!(raw, "done");
}

#[test]
fn test_unknown_status_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store
        .conn()
        .execute(
            "INSERT INTO tasks (id, title, status) VALUES (1, 'odd', 'archived')",
            [],
        )
        .unwrap();
    assert!(matches!(
        store.load_snapshot(1),
        Err(PersistenceError::CorruptStatus(_))
    ));
}

#[test]
fn test_delete_task_removes_subtasks() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let id = svc.create_task(&admin(), "Temp").unwrap();
    svc.add_subtask(&admin(), id, "a").unwrap();

    let employee = AuthContext::new("e", Role::Employee);
    assert!(matches!(
        svc.delete_task(&employee, id),
        Err(ServiceError::Forbidden { .. })
    ));

    svc.delete_task(&admin(), id).unwrap();
    let left: i64 = svc
        .store()
        .conn()
        .query_row("SELECT COUNT(*) FROM subtasks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 0);
    assert!(matches!(
        svc.snapshot(id),
        Err(ServiceError::Persistence(PersistenceError::TaskNotFound(_)))
    ));
}

#[test]
fn test_in_memory_database() {
    let mut store = SqliteStore::in_memory().unwrap();
    let id = store.create_task("scratch").unwrap();
    assert_eq!(store.list_tasks().unwrap().len(), 1);
    assert_eq!(store.next_subtask_id().unwrap(), 1);
    assert_eq!(store.load_snapshot(id).unwrap().task.status, TaskStatus::ToDo);
}

#[test]
fn test_deleted_ids_are_not_reused() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let old = svc.create_task(&admin(), "old").unwrap();
    svc.add_subtask(&admin(), old, "a").unwrap();
    let old_sub = svc.snapshot(old).unwrap().subtask_ids()[0];
    svc.set_task_status(&admin(), old, TaskStatus::Done).unwrap();
    svc.delete_task(&admin(), old).unwrap();

    let fresh = svc.create_task(&admin(), "brand new").unwrap();
    assert_ne!(fresh, old);
    assert!(svc.history(Some(fresh), 10).unwrap().is_empty());

    svc.add_subtask(&admin(), fresh, "b").unwrap();
    let fresh_sub = svc.snapshot(fresh).unwrap().subtask_ids()[0];
    assert!(fresh_sub > old_sub);
    assert_eq!(svc.history(Some(fresh), 10).unwrap().len(), 1);
}

#[test]
fn test_removed_subtask_id_is_not_reused() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let id = svc.create_task(&admin(), "Checklist").unwrap();
    svc.add_subtask(&admin(), id, "a").unwrap();
    svc.add_subtask(&admin(), id, "b").unwrap();
    let ids = svc.snapshot(id).unwrap().subtask_ids();

    svc.remove_subtask(&admin(), id, ids[1]).unwrap();
    svc.add_subtask(&admin(), id, "c").unwrap();
    let after = svc.snapshot(id).unwrap().subtask_ids();
    assert_eq!(after.len(), 2);
    assert!(after[1] > ids[1]);
}

#[test]
fn test_unsub_workflow_persists() {
    let dir = TempDir::new().unwrap();
    let mut svc = TaskService::new(open_store(&dir), &Config::default());
    let auth = AuthContext::new("dana", Role::Employee);
    let id = svc.create_task(&auth, "Release").unwrap();
    for title in ["tag", "publish"] {
        svc.add_subtask(&auth, id, title).unwrap();
    }
    let ids = svc.snapshot(id).unwrap().subtask_ids();
    svc.toggle_subtask(&auth, id, ids[0]).unwrap();

    let (after, changes) = svc.remove_subtask(&auth, id, ids[1]).unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(after.task.status, TaskStatus::Done);
    assert_eq!(svc.snapshot(id).unwrap(), after);

    let rows: i64 = svc
        .store()
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM subtasks WHERE id = ?1",
            params![ids[1]],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(svc.history(Some(id), 1).unwrap()[0].entity, "task");

    assert!(matches!(
        svc.remove_subtask(&auth, id, ids[1]),
        Err(ServiceError::Engine(_))
    ));
}

#[test]
fn test_snapshot_read_leaves_no_open_transaction() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let id = store.create_task("Read").unwrap();
    let snap = store.load_snapshot(id).unwrap();
    assert!(store.conn().is_autocommit());

    let (_, changes) = state::set_task_status(&snap, TaskStatus::InProgress).unwrap();
    store.apply_changes(&snap, &changes, "reader").unwrap();
    assert_eq!(
        store.load_snapshot(id).unwrap().task.status,
        TaskStatus::InProgress
    );
}

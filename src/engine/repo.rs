//! SQLite-backed `TaskStore`: all database operations in one place.

mod changes;
mod subtasks;
mod tasks;

pub use changes::ChangeRepo;
pub use subtasks::SubtaskRepo;
pub use tasks::{TaskRepo, TASK_SELECT};

use super::db::Db;
use super::error::PersistenceError;
use super::store::{ChangeRecord, TaskStore};
use super::types::{Change, Snapshot, SubtaskId, Task, TaskId};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens an existing database file.
    ///
    /// # Errors
    /// Returns `NotInitialized` if the file is missing.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self::new(Db::connect(path)?))
    }

    /// Opens a fresh in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self, PersistenceError> {
        Ok(Self::new(Db::open_in_memory()?))
    }

    /// Returns the underlying database connection.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn load_snapshot_in(conn: &Connection, task_id: TaskId) -> Result<Snapshot, PersistenceError> {
    let task = TaskRepo::new(conn)
        .find_by_id(task_id)?
        .ok_or(PersistenceError::TaskNotFound(task_id))?;
    let subtasks = SubtaskRepo::new(conn).for_task(task_id)?;
    Ok(Snapshot::new(task, subtasks))
}

fn write_change(conn: &Connection, task_id: TaskId, change: &Change) -> Result<(), PersistenceError> {
    let subtasks = SubtaskRepo::new(conn);
    let written = match change {
        Change::Task { id, to, .. } => TaskRepo::new(conn).update_status(*id, *to)?,
        Change::Subtask { id, to, .. } => subtasks.update_status(task_id, *id, *to)?,
        Change::SubtaskAdded { subtask } => {
            if subtasks.exists(subtask.id)? {
                false
            } else {
                subtasks.insert(subtask)?;
                true
            }
        }
        Change::SubtaskRemoved { subtask } => subtasks.delete(task_id, subtask.id)?,
    };

    if written {
        Ok(())
    } else {
        Err(PersistenceError::Conflict {
            task: task_id,
            reason: format!("could not apply '{change}'"),
        })
    }
}

impl TaskStore for SqliteStore {
    fn create_task(&mut self, title: &str) -> Result<TaskId, PersistenceError> {
        let id = TaskRepo::new(&self.conn).add(title)?;
        info!(task_id = id, "created task");
        Ok(id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        TaskRepo::new(&self.conn).get_all()
    }

    fn load_snapshot(&self, task_id: TaskId) -> Result<Snapshot, PersistenceError> {
        // Task row and subtask rows come from one read transaction.
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = load_snapshot_in(&tx, task_id)?;
        tx.commit()?;
        Ok(snapshot)
    }

    fn next_subtask_id(&self) -> Result<SubtaskId, PersistenceError> {
        Ok(SubtaskRepo::new(&self.conn).last_allocated_id()? + 1)
    }

    fn apply_changes(
        &mut self,
        base: &Snapshot,
        changes: &[Change],
        actor: &str,
    ) -> Result<(), PersistenceError> {
        let task_id = base.task.id;
        // IMMEDIATE takes the write lock up front, so the comparison below
        // and the writes see the same database state.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_snapshot_in(&tx, task_id)?;
        if current != *base {
            warn!(task_id, "stored task differs from the snapshot changes were computed from");
            return Err(PersistenceError::Conflict {
                task: task_id,
                reason: "task changed since it was read".to_string(),
            });
        }

        let log = ChangeRepo::new(&tx);
        for change in changes {
            write_change(&tx, task_id, change)?;
            log.record(&ChangeRecord::new(task_id, change, actor))?;
        }
        tx.commit()?;

        debug!(task_id, changes = changes.len(), actor, "applied changes");
        Ok(())
    }

    fn delete_task(&mut self, task_id: TaskId) -> Result<(), PersistenceError> {
        if TaskRepo::new(&self.conn).delete(task_id)? {
            info!(task_id, "deleted task");
            Ok(())
        } else {
            Err(PersistenceError::TaskNotFound(task_id))
        }
    }

    fn history(
        &self,
        task_id: Option<TaskId>,
        limit: usize,
    ) -> Result<Vec<ChangeRecord>, PersistenceError> {
        ChangeRepo::new(&self.conn).recent(task_id, limit)
    }
}

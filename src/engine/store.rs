//! Persistence Gateway: how request handlers load snapshots and write changes.
//!
//! `SqliteStore` (see `repo`) is the real backend; `MemoryStore` keeps
//! everything in a map and is what the tests run against.

use super::error::PersistenceError;
use super::types::{Change, Snapshot, SubtaskId, Task, TaskId, TaskStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Storage for task aggregates.
///
/// `apply_changes` is all-or-nothing and optimistic: it is handed the
/// snapshot the changes were computed from, and if the stored aggregate no
/// longer equals it the whole list is rejected with
/// `PersistenceError::Conflict`. Tasks are independent; nothing locks
/// across aggregates.
pub trait TaskStore {
    /// Inserts a new task in `to_do` and returns its id.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    fn create_task(&mut self, title: &str) -> Result<TaskId, PersistenceError>;

    /// Lists every task, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError>;

    /// Reads a task and all of its subtasks.
    ///
    /// # Errors
    /// Returns `TaskNotFound` if the task does not exist.
    fn load_snapshot(&self, task_id: TaskId) -> Result<Snapshot, PersistenceError>;

    /// Proposes an unused subtask id. Not reserved: a concurrent writer
    /// taking it first surfaces as a `Conflict` on apply.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn next_subtask_id(&self) -> Result<SubtaskId, PersistenceError>;

    /// Writes a change list for one task atomically and records it in history.
    ///
    /// # Errors
    /// Returns `Conflict` if the stored aggregate differs from `base`.
    fn apply_changes(
        &mut self,
        base: &Snapshot,
        changes: &[Change],
        actor: &str,
    ) -> Result<(), PersistenceError>;

    /// Deletes a task together with its subtasks.
    ///
    /// # Errors
    /// Returns `TaskNotFound` if the task does not exist.
    fn delete_task(&mut self, task_id: TaskId) -> Result<(), PersistenceError>;

    /// Recent change history, newest first, optionally for one task.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn history(
        &self,
        task_id: Option<TaskId>,
        limit: usize,
    ) -> Result<Vec<ChangeRecord>, PersistenceError>;
}

/// One applied change as kept in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub task_id: TaskId,
    pub entity: String,
    pub entity_id: i64,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor: String,
    pub recorded_at: String,
}

impl ChangeRecord {
    #[must_use]
    pub fn new(task_id: TaskId, change: &Change, actor: &str) -> Self {
        Self {
            task_id,
            entity: change.entity().to_string(),
            entity_id: change.id(),
            field: change.field().as_str().to_string(),
            old_value: change.old_value(),
            new_value: change.new_value(),
            actor: actor.to_string(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// In-memory store with the same optimistic semantics as `SqliteStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: BTreeMap<TaskId, Snapshot>,
    history: Vec<ChangeRecord>,
    next_task_id: TaskId,
    last_subtask_id: SubtaskId,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryStore {
    fn create_task(&mut self, title: &str) -> Result<TaskId, PersistenceError> {
        self.next_task_id += 1;
        let id = self.next_task_id;
        let task = Task {
            id,
            title: title.to_string(),
            status: TaskStatus::ToDo,
        };
        self.tasks.insert(id, Snapshot::new(task, Vec::new()));
        Ok(id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        Ok(self.tasks.values().map(|s| s.task.clone()).collect())
    }

    fn load_snapshot(&self, task_id: TaskId) -> Result<Snapshot, PersistenceError> {
        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or(PersistenceError::TaskNotFound(task_id))
    }

    fn next_subtask_id(&self) -> Result<SubtaskId, PersistenceError> {
        Ok(self.last_subtask_id + 1)
    }

    fn apply_changes(
        &mut self,
        base: &Snapshot,
        changes: &[Change],
        actor: &str,
    ) -> Result<(), PersistenceError> {
        let task_id = base.task.id;
        let current = self.load_snapshot(task_id)?;
        if current != *base {
            return Err(PersistenceError::Conflict {
                task: task_id,
                reason: "task changed since it was read".to_string(),
            });
        }
        for change in changes {
            if let Change::SubtaskAdded { subtask } = change {
                let taken = self
                    .tasks
                    .values()
                    .any(|s| s.subtask(subtask.id).is_some());
                if taken {
                    return Err(PersistenceError::Conflict {
                        task: task_id,
                        reason: format!("subtask id #{} is taken", subtask.id),
                    });
                }
            }
        }
        let next = current
            .apply_changes(changes)
            .map_err(|e| PersistenceError::Conflict {
                task: task_id,
                reason: e.to_string(),
            })?;

        for change in changes {
            if let Change::SubtaskAdded { subtask } = change {
                self.last_subtask_id = self.last_subtask_id.max(subtask.id);
            }
        }
        self.tasks.insert(task_id, next);
        self.history
            .extend(changes.iter().map(|c| ChangeRecord::new(task_id, c, actor)));
        Ok(())
    }

    fn delete_task(&mut self, task_id: TaskId) -> Result<(), PersistenceError> {
        self.tasks
            .remove(&task_id)
            .map(|_| ())
            .ok_or(PersistenceError::TaskNotFound(task_id))
    }

    fn history(
        &self,
        task_id: Option<TaskId>,
        limit: usize,
    ) -> Result<Vec<ChangeRecord>, PersistenceError> {
        Ok(self
            .history
            .iter()
            .rev()
            .filter(|r| task_id.map_or(true, |id| r.task_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}

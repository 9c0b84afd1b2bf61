//! Subtask Repository: checklist rows, kept in insertion order.

use crate::engine::error::PersistenceError;
use crate::engine::types::{Subtask, SubtaskId, SubtaskStatus, TaskId};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SubtaskRepo<'a> {
    conn: &'a Connection,
}

impl<'a> SubtaskRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Retrieves the subtasks of a task in display order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row holds an unknown status.
    pub fn for_task(&self, task_id: TaskId) -> Result<Vec<Subtask>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, status FROM subtasks WHERE task_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt.query_map(params![task_id], |r| {
            Ok((r.get::<_, SubtaskId>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?;

        let mut subtasks = Vec::new();
        for row in rows {
            let (id, title, status) = row?;
            let status: SubtaskStatus = status.parse().map_err(PersistenceError::CorruptStatus)?;
            subtasks.push(Subtask {
                id,
                task_id,
                title,
                status,
            });
        }
        Ok(subtasks)
    }

    /// Returns true if any task already owns a subtask with this id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn exists(&self, id: SubtaskId) -> Result<bool, PersistenceError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM subtasks WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Highest subtask id ever handed out, or 0. Reads the AUTOINCREMENT
    /// sequence so ids of deleted subtasks are never offered again.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn last_allocated_id(&self) -> Result<SubtaskId, PersistenceError> {
        let last: i64 = self.conn.query_row(
            "SELECT MAX(
                 COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'subtasks'), 0),
                 COALESCE((SELECT MAX(id) FROM subtasks), 0))",
            [],
            |r| r.get(0),
        )?;
        Ok(last)
    }

    /// Appends a subtask after the task's existing ones.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn insert(&self, subtask: &Subtask) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO subtasks (id, task_id, title, status, position)
             VALUES (?1, ?2, ?3, ?4,
                     (SELECT COALESCE(MAX(position), 0) + 1 FROM subtasks WHERE task_id = ?2))",
            params![
                subtask.id,
                subtask.task_id,
                subtask.title,
                subtask.status.as_str()
            ],
        )?;
        Ok(())
    }

    /// Writes the canonical spelling of a status.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn update_status(
        &self,
        task_id: TaskId,
        id: SubtaskId,
        status: SubtaskStatus,
    ) -> Result<bool, PersistenceError> {
        let n = self.conn.execute(
            "UPDATE subtasks SET status = ?1 WHERE id = ?2 AND task_id = ?3",
            params![status.as_str(), id, task_id],
        )?;
        Ok(n == 1)
    }

    /// Removes one subtask from a task.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete(&self, task_id: TaskId, id: SubtaskId) -> Result<bool, PersistenceError> {
        let n = self.conn.execute(
            "DELETE FROM subtasks WHERE id = ?1 AND task_id = ?2",
            params![id, task_id],
        )?;
        Ok(n == 1)
    }
}

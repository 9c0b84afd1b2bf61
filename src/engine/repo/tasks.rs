//! Task Repository: rows of the `tasks` table.

use crate::engine::error::PersistenceError;
use crate::engine::types::{Task, TaskId, TaskStatus};
use rusqlite::{params, Connection, OptionalExtension};

pub const TASK_SELECT: &str = "SELECT id, title, status FROM tasks";

pub struct TaskRepo<'a> {
    conn: &'a Connection,
}

impl<'a> TaskRepo<'a> {
    /// Creates a new repository instance borrowing the connection.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Adds a new task in `to_do`.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn add(&self, title: &str) -> Result<TaskId, PersistenceError> {
        self.conn.execute(
            "INSERT INTO tasks (title, status) VALUES (?1, ?2)",
            params![title, TaskStatus::ToDo.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Retrieves all tasks, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row holds an unknown status.
    pub fn get_all(&self) -> Result<Vec<Task>, PersistenceError> {
        let sql = format!("{TASK_SELECT} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, TaskId>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?;
        let mut tasks = Vec::new();
        for row in rows {
            let (id, title, status) = row?;
            tasks.push(task_from_row(id, title, &status)?);
        }
        Ok(tasks)
    }

    /// Finds a task by its ID.
    ///
    /// # Errors
    /// Returns an error if the query fails or the row holds an unknown status.
    pub fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, PersistenceError> {
        let sql = format!("{TASK_SELECT} WHERE id = ?1");
        let row: Option<(TaskId, String, String)> = self
            .conn
            .query_row(&sql, params![id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .optional()?;
        row.map(|(id, title, status)| task_from_row(id, title, &status))
            .transpose()
    }

    /// Writes the canonical spelling of a status.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<bool, PersistenceError> {
        let n = self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(n == 1)
    }

    /// Deletes a task; its subtasks go with it.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete(&self, id: TaskId) -> Result<bool, PersistenceError> {
        let n = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(n == 1)
    }
}

fn task_from_row(id: TaskId, title: String, status: &str) -> Result<Task, PersistenceError> {
    let status = status.parse().map_err(PersistenceError::CorruptStatus)?;
    Ok(Task { id, title, status })
}

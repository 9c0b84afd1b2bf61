//! Change Log Repository: audit trail of every applied change.

use crate::engine::error::PersistenceError;
use crate::engine::store::ChangeRecord;
use crate::engine::types::TaskId;
use rusqlite::{params, Connection};

const CHANGE_SELECT: &str = "SELECT task_id, entity, entity_id, field, old_value, new_value, actor, recorded_at FROM changes";

pub struct ChangeRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ChangeRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Appends one record.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn record(&self, rec: &ChangeRecord) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO changes (task_id, entity, entity_id, field, old_value, new_value, actor, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.task_id,
                rec.entity,
                rec.entity_id,
                rec.field,
                rec.old_value,
                rec.new_value,
                rec.actor,
                rec.recorded_at
            ],
        )?;
        Ok(())
    }

    /// Most recent records first, optionally restricted to one task.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn recent(
        &self,
        task_id: Option<TaskId>,
        limit: usize,
    ) -> Result<Vec<ChangeRecord>, PersistenceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "{CHANGE_SELECT} WHERE (?1 IS NULL OR task_id = ?1) ORDER BY id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![task_id, limit], |row| {
            Ok(ChangeRecord {
                task_id: row.get(0)?,
                entity: row.get(1)?,
                entity_id: row.get(2)?,
                field: row.get(3)?,
                old_value: row.get(4)?,
                new_value: row.get(5)?,
                actor: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;

        let mut history = Vec::new();
        for item in rows {
            history.push(item?);
        }
        Ok(history)
    }
}

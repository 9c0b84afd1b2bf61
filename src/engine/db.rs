//! SQLite connection setup and schema.

use super::error::PersistenceError;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS subtasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        status TEXT NOT NULL,
        position INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id, position);

    CREATE TABLE IF NOT EXISTS changes (
        id INTEGER PRIMARY KEY,
        task_id INTEGER NOT NULL,
        entity TEXT NOT NULL,
        entity_id INTEGER NOT NULL,
        field TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT,
        actor TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );
";

pub struct Db;

impl Db {
    /// Creates the database file (and its directory) and applies the schema.
    ///
    /// # Errors
    /// Returns error if directory creation, DB opening, or migration fails.
    pub fn init(path: &Path) -> Result<Connection, PersistenceError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(conn)
    }

    /// Connects to an existing database.
    ///
    /// # Errors
    /// Returns `NotInitialized` if the file does not exist.
    pub fn connect(path: &Path) -> Result<Connection, PersistenceError> {
        if !path.exists() {
            return Err(PersistenceError::NotInitialized(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(conn)
    }

    /// Opens a private in-memory database with the schema applied.
    ///
    /// # Errors
    /// Returns error if migration fails.
    pub fn open_in_memory() -> Result<Connection, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(conn)
    }

    fn configure(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    fn migrate(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

//! Error types for the engine, the stores and the service layer.

use super::types::{EntityKind, SubtaskId, TaskId};
use thiserror::Error;

/// Failures of the pure status engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("subtask #{subtask} not found on task #{task}")]
    SubtaskNotFound { task: TaskId, subtask: SubtaskId },

    #[error("subtask #{subtask} already exists on task #{task}")]
    DuplicateSubtask { task: TaskId, subtask: SubtaskId },

    #[error("invalid {entity} status '{value}'")]
    InvalidStatus { entity: EntityKind, value: String },

    #[error("change '{change}' does not match current value '{current}'")]
    StaleChange { change: String, current: String },

    #[error("change targets task #{found}, snapshot holds task #{expected}")]
    WrongTask { expected: TaskId, found: TaskId },
}

/// Failures raised by a `TaskStore`.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("task #{0} not found")]
    TaskNotFound(TaskId),

    /// Storage no longer holds the value a change was computed from.
    #[error("conflict on task #{task}: {reason}")]
    Conflict { task: TaskId, reason: String },

    #[error("no database at {}; run `taskflow init` first", .0.display())]
    NotInitialized(std::path::PathBuf),

    #[error("stored row is unreadable: {0}")]
    CorruptStatus(#[source] EngineError),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Failures surfaced to request handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{role} '{user}' may not {action}")]
    Forbidden {
        user: String,
        role: String,
        action: &'static str,
    },
}

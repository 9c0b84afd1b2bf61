//! Core types for taskflow.
//!
//! Status enums carry the canonical vocabulary. Legacy spellings found in
//! older rows (`completed`, `to_do` for subtasks, ...) are folded in by the
//! `FromStr` impls, which are the only place string statuses are parsed.

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i64;
pub type SubtaskId = i64;

/// Aggregate status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Canonical storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "to_do",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to_do" | "todo" | "to-do" | "pending" => Ok(Self::ToDo),
            "in_progress" | "in-progress" | "inprogress" | "active" => Ok(Self::InProgress),
            "done" | "completed" | "complete" => Ok(Self::Done),
            _ => Err(EngineError::InvalidStatus {
                entity: EntityKind::Task,
                value: s.to_string(),
            }),
        }
    }
}

/// Completion state of a checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    Done,
}

impl SubtaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    /// The opposite state, used by toggles.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtaskStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "to_do" | "todo" | "to-do" => Ok(Self::Pending),
            "done" | "completed" | "complete" => Ok(Self::Done),
            _ => Err(EngineError::InvalidStatus {
                entity: EntityKind::Subtask,
                value: s.to_string(),
            }),
        }
    }
}

/// A top-level unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

/// A checklist item owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub task_id: TaskId,
    pub title: String,
    pub status: SubtaskStatus,
}

/// A task and all of its subtasks, read at one instant.
///
/// Snapshots are values: engine operations take one by reference and hand
/// back a new one alongside the changes that lead to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub task: Task,
    pub subtasks: Vec<Subtask>,
}

impl Snapshot {
    #[must_use]
    pub fn new(task: Task, subtasks: Vec<Subtask>) -> Self {
        Self { task, subtasks }
    }

    /// Subtask ids in display order.
    #[must_use]
    pub fn subtask_ids(&self) -> Vec<SubtaskId> {
        self.subtasks.iter().map(|s| s.id).collect()
    }

    #[must_use]
    pub fn subtask(&self, id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    /// True when there is at least one subtask and every one is done.
    #[must_use]
    pub fn all_subtasks_done(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.status == SubtaskStatus::Done)
    }

    /// Number of done subtasks and total subtasks.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .subtasks
            .iter()
            .filter(|s| s.status == SubtaskStatus::Done)
            .count();
        (done, self.subtasks.len())
    }

    /// Checks that a done task has no unfinished subtasks.
    ///
    /// A task without subtasks may hold any status.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.task.status != TaskStatus::Done
            || self.subtasks.iter().all(|s| s.status == SubtaskStatus::Done)
    }

    pub(crate) fn subtask_index(&self, id: SubtaskId) -> Result<usize, EngineError> {
        self.subtasks
            .iter()
            .position(|s| s.id == id)
            .ok_or(EngineError::SubtaskNotFound {
                task: self.task.id,
                subtask: id,
            })
    }

    /// Replays a change list onto this snapshot.
    ///
    /// Every change must fit: status changes must start from the value held
    /// here, added subtasks must be new, removed subtasks must exist.
    ///
    /// # Errors
    /// Returns an `EngineError` describing the first change that does not fit.
    pub fn apply_changes(&self, changes: &[Change]) -> Result<Snapshot, EngineError> {
        let mut next = self.clone();
        for change in changes {
            next.apply_one(change)?;
        }
        Ok(next)
    }

    fn apply_one(&mut self, change: &Change) -> Result<(), EngineError> {
        match change {
            Change::Task { id, from, to } => {
                if *id != self.task.id {
                    return Err(EngineError::WrongTask {
                        expected: self.task.id,
                        found: *id,
                    });
                }
                if self.task.status != *from {
                    return Err(EngineError::StaleChange {
                        change: change.to_string(),
                        current: self.task.status.to_string(),
                    });
                }
                self.task.status = *to;
            }
            Change::Subtask { id, from, to } => {
                let idx = self.subtask_index(*id)?;
                let current = self.subtasks[idx].status;
                if current != *from {
                    return Err(EngineError::StaleChange {
                        change: change.to_string(),
                        current: current.to_string(),
                    });
                }
                self.subtasks[idx].status = *to;
            }
            Change::SubtaskAdded { subtask } => {
                if subtask.task_id != self.task.id {
                    return Err(EngineError::WrongTask {
                        expected: self.task.id,
                        found: subtask.task_id,
                    });
                }
                if self.subtask(subtask.id).is_some() {
                    return Err(EngineError::DuplicateSubtask {
                        task: self.task.id,
                        subtask: subtask.id,
                    });
                }
                self.subtasks.push(subtask.clone());
            }
            Change::SubtaskRemoved { subtask } => {
                let idx = self.subtask_index(subtask.id)?;
                self.subtasks.remove(idx);
            }
        }
        Ok(())
    }
}

/// Which kind of record a change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Subtask,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Subtask => "subtask",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which attribute of the record a change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Status,
    /// The record itself appears or disappears.
    Existence,
}

impl Field {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Existence => "existence",
        }
    }
}

/// One mutation computed by the engine, to be applied by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Task {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    Subtask {
        id: SubtaskId,
        from: SubtaskStatus,
        to: SubtaskStatus,
    },
    SubtaskAdded {
        subtask: Subtask,
    },
    SubtaskRemoved {
        subtask: Subtask,
    },
}

impl Change {
    #[must_use]
    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Task { .. } => EntityKind::Task,
            Self::Subtask { .. } | Self::SubtaskAdded { .. } | Self::SubtaskRemoved { .. } => {
                EntityKind::Subtask
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Task { id, .. } | Self::Subtask { id, .. } => *id,
            Self::SubtaskAdded { subtask } | Self::SubtaskRemoved { subtask } => subtask.id,
        }
    }

    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Task { .. } | Self::Subtask { .. } => Field::Status,
            Self::SubtaskAdded { .. } | Self::SubtaskRemoved { .. } => Field::Existence,
        }
    }

    /// Old value as stored text; `None` when the record did not exist.
    #[must_use]
    pub fn old_value(&self) -> Option<String> {
        match self {
            Self::Task { from, .. } => Some(from.to_string()),
            Self::Subtask { from, .. } => Some(from.to_string()),
            Self::SubtaskAdded { .. } => None,
            Self::SubtaskRemoved { subtask } => Some(subtask.status.to_string()),
        }
    }

    /// New value as stored text; `None` when the record is gone.
    #[must_use]
    pub fn new_value(&self) -> Option<String> {
        match self {
            Self::Task { to, .. } => Some(to.to_string()),
            Self::Subtask { to, .. } => Some(to.to_string()),
            Self::SubtaskAdded { subtask } => Some(subtask.status.to_string()),
            Self::SubtaskRemoved { .. } => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task { id, from, to } => write!(f, "task #{id}: {from} -> {to}"),
            Self::Subtask { id, from, to } => write!(f, "subtask #{id}: {from} -> {to}"),
            Self::SubtaskAdded { subtask } => {
                write!(f, "subtask #{} added: \"{}\"", subtask.id, subtask.title)
            }
            Self::SubtaskRemoved { subtask } => {
                write!(f, "subtask #{} removed: \"{}\"", subtask.id, subtask.title)
            }
        }
    }
}

/// A single user action against one task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ToggleSubtask(SubtaskId),
    SetSubtaskStatus(SubtaskId, SubtaskStatus),
    AddSubtask { id: SubtaskId, title: String },
    RemoveSubtask(SubtaskId),
    SetTaskStatus(TaskStatus),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToggleSubtask(id) => write!(f, "toggle subtask #{id}"),
            Self::SetSubtaskStatus(id, status) => write!(f, "mark subtask #{id} {status}"),
            Self::AddSubtask { id, title } => write!(f, "add subtask #{id} \"{title}\""),
            Self::RemoveSubtask(id) => write!(f, "remove subtask #{id}"),
            Self::SetTaskStatus(status) => write!(f, "set task status {status}"),
        }
    }
}

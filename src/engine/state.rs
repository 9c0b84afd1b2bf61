//! Status Engine: keeps a task's status in step with its checklist.
//!
//! Every operation here is a pure function from a `Snapshot` (plus one
//! event) to the next `Snapshot` and the ordered `Change` list that gets
//! there. No I/O, no side effects; stores apply the changes.
//!
//! Rules, for a task with at least one subtask:
//! - all subtasks done → task done
//! - task done and some subtask not done → task in progress
//!
//! A task without subtasks is left to the user. The direct status override
//! cascades downwards only when completing: marking a task done marks every
//! subtask done, moving it off done leaves the subtasks alone.

use super::error::EngineError;
use super::types::{Change, Event, Snapshot, Subtask, SubtaskId, SubtaskStatus, TaskStatus};

/// The next snapshot and the changes that produce it, subtask changes first.
pub type Transition = (Snapshot, Vec<Change>);

/// Flips one subtask between pending and done, then reconciles the task.
///
/// # Errors
/// Returns `SubtaskNotFound` if the id is not part of the snapshot.
pub fn toggle_subtask(snapshot: &Snapshot, subtask_id: SubtaskId) -> Result<Transition, EngineError> {
    let idx = snapshot.subtask_index(subtask_id)?;
    let target = snapshot.subtasks[idx].status.flipped();
    set_subtask_status(snapshot, subtask_id, target)
}

/// Sets one subtask to an explicit status, then reconciles the task.
///
/// Setting a subtask to the status it already holds is a no-op.
///
/// # Errors
/// Returns `SubtaskNotFound` if the id is not part of the snapshot.
pub fn set_subtask_status(
    snapshot: &Snapshot,
    subtask_id: SubtaskId,
    status: SubtaskStatus,
) -> Result<Transition, EngineError> {
    let idx = snapshot.subtask_index(subtask_id)?;
    let current = snapshot.subtasks[idx].status;
    if current == status {
        return Ok((snapshot.clone(), Vec::new()));
    }

    let mut next = snapshot.clone();
    next.subtasks[idx].status = status;
    let mut changes = vec![Change::Subtask {
        id: subtask_id,
        from: current,
        to: status,
    }];
    reconcile(&mut next, &mut changes);
    Ok((next, changes))
}

/// Appends a new pending subtask.
///
/// A done task gets a new unfinished item, so it drops back to in progress.
///
/// # Errors
/// Returns `DuplicateSubtask` if the id is already taken in this snapshot.
pub fn add_subtask(
    snapshot: &Snapshot,
    subtask_id: SubtaskId,
    title: &str,
) -> Result<Transition, EngineError> {
    if snapshot.subtask(subtask_id).is_some() {
        return Err(EngineError::DuplicateSubtask {
            task: snapshot.task.id,
            subtask: subtask_id,
        });
    }

    let subtask = Subtask {
        id: subtask_id,
        task_id: snapshot.task.id,
        title: title.to_string(),
        status: SubtaskStatus::Pending,
    };
    let mut next = snapshot.clone();
    next.subtasks.push(subtask.clone());
    let mut changes = vec![Change::SubtaskAdded { subtask }];
    reconcile(&mut next, &mut changes);
    Ok((next, changes))
}

/// Removes a subtask.
///
/// If the remaining subtasks are all done the task completes. With no
/// subtasks left the task status is kept as is.
///
/// # Errors
/// Returns `SubtaskNotFound` if the id is not part of the snapshot.
pub fn remove_subtask(snapshot: &Snapshot, subtask_id: SubtaskId) -> Result<Transition, EngineError> {
    let idx = snapshot.subtask_index(subtask_id)?;
    let mut next = snapshot.clone();
    let subtask = next.subtasks.remove(idx);
    let mut changes = vec![Change::SubtaskRemoved { subtask }];
    reconcile(&mut next, &mut changes);
    Ok((next, changes))
}

/// Direct status override from the user.
///
/// Completing a task completes every unfinished subtask first. Any other
/// target only touches the task itself, even if that leaves the task out
/// of step with its subtasks.
///
/// # Errors
/// Never fails.
pub fn set_task_status(snapshot: &Snapshot, status: TaskStatus) -> Result<Transition, EngineError> {
    let mut next = snapshot.clone();
    let mut changes = Vec::new();

    if status == TaskStatus::Done {
        for sub in &mut next.subtasks {
            if sub.status != SubtaskStatus::Done {
                changes.push(Change::Subtask {
                    id: sub.id,
                    from: sub.status,
                    to: SubtaskStatus::Done,
                });
                sub.status = SubtaskStatus::Done;
            }
        }
    }

    if next.task.status != status {
        changes.push(Change::Task {
            id: next.task.id,
            from: next.task.status,
            to: status,
        });
        next.task.status = status;
    }

    Ok((next, changes))
}

/// Dispatches an event to the matching operation.
///
/// # Errors
/// Propagates the error of the selected operation.
pub fn apply(snapshot: &Snapshot, event: &Event) -> Result<Transition, EngineError> {
    match event {
        Event::ToggleSubtask(id) => toggle_subtask(snapshot, *id),
        Event::SetSubtaskStatus(id, status) => set_subtask_status(snapshot, *id, *status),
        Event::AddSubtask { id, title } => add_subtask(snapshot, *id, title),
        Event::RemoveSubtask(id) => remove_subtask(snapshot, *id),
        Event::SetTaskStatus(status) => set_task_status(snapshot, *status),
    }
}

/// Returns the status the task should hold given its subtasks, if it differs.
#[must_use]
pub fn derive_task_status(snapshot: &Snapshot) -> Option<TaskStatus> {
    if snapshot.subtasks.is_empty() {
        return None;
    }
    let current = snapshot.task.status;
    if snapshot.all_subtasks_done() {
        (current != TaskStatus::Done).then_some(TaskStatus::Done)
    } else {
        (current == TaskStatus::Done).then_some(TaskStatus::InProgress)
    }
}

fn reconcile(next: &mut Snapshot, changes: &mut Vec<Change>) {
    if let Some(status) = derive_task_status(next) {
        changes.push(Change::Task {
            id: next.task.id,
            from: next.task.status,
            to: status,
        });
        next.task.status = status;
    }
}

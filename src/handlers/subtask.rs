//! Handlers for checklist commands: `sub`, `toggle`, `mark`, `unsub`.

use super::{print_changes, task_status_label};
use anyhow::{bail, Result};
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, TaskService};
use taskflow::engine::state::Transition;
use taskflow::engine::types::{Change, SubtaskStatus};

type Service = TaskService<SqliteStore>;

/// Adds a checklist item.
///
/// # Errors
/// Returns error if the title is empty, the task is unknown or the write fails.
pub fn add(service: &mut Service, auth: &AuthContext, task: i64, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        bail!("Subtask title cannot be empty");
    }
    let result = service.add_subtask(auth, task, title)?;
    if let Some(Change::SubtaskAdded { subtask }) = result.1.first() {
        println!("{} Added subtask #{} to task #{task}", "✓".green(), subtask.id.to_string().yellow());
    }
    report(&result);
    Ok(())
}

/// Flips a checklist item.
///
/// # Errors
/// Returns error if the task or subtask is unknown or the write fails.
pub fn toggle(service: &mut Service, auth: &AuthContext, task: i64, subtask: i64) -> Result<()> {
    let result = service.toggle_subtask(auth, task, subtask)?;
    report(&result);
    Ok(())
}

/// Sets a checklist item to an explicit status.
///
/// # Errors
/// Returns error if the task or subtask is unknown or the write fails.
pub fn mark(
    service: &mut Service,
    auth: &AuthContext,
    task: i64,
    subtask: i64,
    status: SubtaskStatus,
) -> Result<()> {
    let result = service.set_subtask_status(auth, task, subtask, status)?;
    report(&result);
    Ok(())
}

/// Removes a checklist item.
///
/// # Errors
/// Returns error if the task or subtask is unknown or the write fails.
pub fn remove(service: &mut Service, auth: &AuthContext, task: i64, subtask: i64) -> Result<()> {
    let result = service.remove_subtask(auth, task, subtask)?;
    report(&result);
    Ok(())
}

fn report((snapshot, changes): &Transition) {
    print_changes(changes);
    let (done, total) = snapshot.progress();
    println!(
        "   Task #{} is {} ({done}/{total} done)",
        snapshot.task.id,
        task_status_label(snapshot.task.status)
    );
}

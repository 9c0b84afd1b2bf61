//! Handler for the `set` command.

use super::{print_changes, task_status_label};
use anyhow::Result;
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, TaskService};
use taskflow::engine::types::TaskStatus;

/// Overrides a task's status. Completing a task completes its checklist.
///
/// # Errors
/// Returns error if the caller lacks the role, the task is unknown or the write fails.
pub fn handle(
    service: &mut TaskService<SqliteStore>,
    auth: &AuthContext,
    task: i64,
    status: TaskStatus,
) -> Result<()> {
    let (snapshot, changes) = service.set_task_status(auth, task, status)?;
    print_changes(&changes);
    println!(
        "{} Task #{} is now {}",
        "✓".green(),
        snapshot.task.id,
        task_status_label(snapshot.task.status)
    );
    if status != TaskStatus::Done && snapshot.all_subtasks_done() {
        println!("   {} checklist left untouched", "note:".dimmed());
    }
    Ok(())
}

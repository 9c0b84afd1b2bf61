//! Handler for the `delete` command.

use anyhow::Result;
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, TaskService};

/// Deletes a task and its checklist.
///
/// # Errors
/// Returns error if the caller lacks the role or the task is unknown.
pub fn handle(service: &mut TaskService<SqliteStore>, auth: &AuthContext, task: i64) -> Result<()> {
    service.delete_task(auth, task)?;
    println!("{} Deleted task #{task}", "✓".green());
    Ok(())
}

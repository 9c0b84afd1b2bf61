//! Handler for the `add` command.

use anyhow::{bail, Result};
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, TaskService};

/// Adds a new task.
///
/// # Errors
/// Returns error if the title is empty or the insert fails.
pub fn handle(service: &mut TaskService<SqliteStore>, auth: &AuthContext, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        bail!("Task title cannot be empty");
    }
    let id = service.create_task(auth, title)?;
    println!("{} Added task #{} {}", "✓".green(), id.to_string().yellow(), title);
    Ok(())
}

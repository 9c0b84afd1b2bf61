//! Handler for the `list` command.

use super::task_status_label;
use anyhow::Result;
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::TaskService;

/// Lists all tasks.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(service: &TaskService<SqliteStore>) -> Result<()> {
    let tasks = service.list_tasks()?;

    println!("{} All Tasks:", "📋".cyan());
    if tasks.is_empty() {
        println!("   (No tasks yet)");
        return Ok(());
    }

    for task in tasks {
        println!(
            "   [{}] {} ({})",
            task.id.to_string().blue(),
            task.title,
            task_status_label(task.status)
        );
    }
    Ok(())
}

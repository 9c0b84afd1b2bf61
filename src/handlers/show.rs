//! Handler for the `show` command.

use super::{subtask_box, task_status_label};
use anyhow::Result;
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::TaskService;
use taskflow::engine::types::Snapshot;

/// Shows one task and its checklist.
///
/// # Errors
/// Returns error if the task is unknown or the query fails.
pub fn handle(service: &TaskService<SqliteStore>, task: i64, json: bool) -> Result<()> {
    let snapshot = service.snapshot(task)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    print_human(&snapshot);
    Ok(())
}

fn print_human(snapshot: &Snapshot) {
    let (done, total) = snapshot.progress();
    println!(
        "#{} {} {}",
        snapshot.task.id.to_string().cyan().bold(),
        snapshot.task.title,
        task_status_label(snapshot.task.status)
    );
    if total == 0 {
        println!("   {}", "(no checklist)".dimmed());
        return;
    }
    for sub in &snapshot.subtasks {
        println!(
            "   {} {} {}",
            subtask_box(sub.status),
            format!("#{}", sub.id).dimmed(),
            sub.title
        );
    }
    println!("   {}", format!("{done}/{total} done").dimmed());
}

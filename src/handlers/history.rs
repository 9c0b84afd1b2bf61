//! Handler for the `history` command.

use anyhow::Result;
use colored::Colorize;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::TaskService;

/// Displays recent status changes.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(service: &TaskService<SqliteStore>, task: Option<i64>, limit: usize) -> Result<()> {
    let history = service.history(task, limit)?;

    println!("{} Change History (last {})", "📜".cyan(), limit);
    println!();

    if history.is_empty() {
        println!("   (No history recorded yet)");
        return Ok(());
    }

    for rec in history {
        let timestamp = &rec.recorded_at[..19.min(rec.recorded_at.len())].replace('T', " ");
        let old = rec.old_value.as_deref().unwrap_or("∅");
        let new = rec.new_value.as_deref().unwrap_or("∅");
        println!(
            "   {}  task #{:<4} {} #{:<4} {} -> {}  {}",
            timestamp.dimmed(),
            rec.task_id,
            rec.entity.bold(),
            rec.entity_id,
            old,
            new.green(),
            rec.actor.dimmed()
        );
    }

    Ok(())
}

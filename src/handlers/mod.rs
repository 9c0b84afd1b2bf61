//! Command handlers: thin adapters over `TaskService`.

pub mod add;
pub mod delete;
pub mod history;
pub mod init;
pub mod list;
pub mod set;
pub mod show;
pub mod subtask;

use colored::{ColoredString, Colorize};
use taskflow::engine::types::{Change, SubtaskStatus, TaskStatus};

pub(crate) fn task_status_label(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::ToDo => "TO DO".dimmed(),
        TaskStatus::InProgress => "IN PROGRESS".yellow(),
        TaskStatus::Done => "DONE".green(),
    }
}

pub(crate) fn subtask_box(status: SubtaskStatus) -> ColoredString {
    match status {
        SubtaskStatus::Pending => "[ ]".dimmed(),
        SubtaskStatus::Done => "[x]".green(),
    }
}

/// Prints what a command changed, or that nothing did.
pub(crate) fn print_changes(changes: &[Change]) {
    if changes.is_empty() {
        println!("   {}", "(no changes)".dimmed());
        return;
    }
    for change in changes {
        let marker = match change {
            Change::Task { .. } => "→".cyan(),
            Change::Subtask { .. } => "·".normal(),
            Change::SubtaskAdded { .. } => "+".green(),
            Change::SubtaskRemoved { .. } => "-".red(),
        };
        println!("   {marker} {change}");
    }
}

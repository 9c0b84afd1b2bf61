mod handlers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskflow::config::Config;
use taskflow::engine::repo::SqliteStore;
use taskflow::engine::service::{AuthContext, Role, TaskService};
use taskflow::engine::types::{SubtaskStatus, TaskStatus};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskflow", version, about = "Tasks and checklists that keep their status straight")]
struct Cli {
    /// Database file (overrides TASKFLOW_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Role to act as: employee, team_admin or admin
    #[arg(long, global = true, env = "TASKFLOW_ROLE", default_value = "admin")]
    role: Role,
    /// Name recorded in the change history
    #[arg(long, global = true, env = "USER", default_value = "local")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Create the database
    Init,
    /// Add a new task
    Add { title: String },
    /// Add a checklist item to a task
    Sub { task: i64, title: String },
    /// Flip a checklist item between pending and done
    Toggle { task: i64, subtask: i64 },
    /// Set a checklist item to pending or done
    Mark {
        task: i64,
        subtask: i64,
        status: SubtaskStatus,
    },
    /// Remove a checklist item
    Unsub { task: i64, subtask: i64 },
    /// Set a task's status directly (to_do, in_progress, done)
    Set { task: i64, status: TaskStatus },
    /// Delete a task and its checklist
    Delete { task: i64 },
    /// Show one task with its checklist
    Show {
        task: i64,
        #[arg(long)]
        json: bool,
    },
    /// List all tasks
    List,
    /// Show recent status changes
    History {
        /// Only changes to this task
        #[arg(long)]
        task: Option<i64>,
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskflow=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    if matches!(cli.command, Commands::Init) {
        return handlers::init::handle(&config);
    }

    let store = SqliteStore::open(&config.db_path)?;
    let mut service = TaskService::new(store, &config);
    let auth = AuthContext::new(cli.user, cli.role);

    match cli.command {
        Commands::Show { .. } | Commands::List | Commands::History { .. } => {
            dispatch_read_ops(&service, cli.command)
        }
        cmd => dispatch_write_ops(&mut service, &auth, cmd),
    }
}

fn dispatch_write_ops(
    service: &mut TaskService<SqliteStore>,
    auth: &AuthContext,
    cmd: Commands,
) -> Result<()> {
    match cmd {
        Commands::Add { title } => handlers::add::handle(service, auth, &title),
        Commands::Sub { task, title } => handlers::subtask::add(service, auth, task, &title),
        Commands::Toggle { task, subtask } => handlers::subtask::toggle(service, auth, task, subtask),
        Commands::Mark {
            task,
            subtask,
            status,
        } => handlers::subtask::mark(service, auth, task, subtask, status),
        Commands::Unsub { task, subtask } => handlers::subtask::remove(service, auth, task, subtask),
        Commands::Set { task, status } => handlers::set::handle(service, auth, task, status),
        Commands::Delete { task } => handlers::delete::handle(service, auth, task),
        _ => unreachable!("Invalid write command dispatch"),
    }
}

fn dispatch_read_ops(service: &TaskService<SqliteStore>, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Show { task, json } => handlers::show::handle(service, task, json),
        Commands::List => handlers::list::handle(service),
        Commands::History { task, limit } => handlers::history::handle(service, task, limit),
        _ => unreachable!("Invalid read command dispatch"),
    }
}

//! Handler for the `init` command.

use anyhow::{Context, Result};
use colored::Colorize;
use taskflow::config::Config;
use taskflow::engine::db::Db;

/// Creates the database and its schema.
///
/// # Errors
/// Returns error if database initialization fails.
pub fn handle(config: &Config) -> Result<()> {
    Db::init(&config.db_path)
        .with_context(|| format!("Failed to initialize {}", config.db_path.display()))?;
    println!("{} Initialized {}", "✓".green(), config.db_path.display());
    Ok(())
}

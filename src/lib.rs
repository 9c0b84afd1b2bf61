//! taskflow: tasks with checklists whose status stays consistent.
//!
//! The `engine` module holds the pure status rules (`engine::state`), the
//! storage gateway (`engine::store`, `engine::repo`) and the service that
//! ties them together for request handlers.

pub mod config;
pub mod engine;

//! Core engine modules for taskflow.

pub mod db;
pub mod error;
pub mod repo;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

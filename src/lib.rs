//! Humans - an internal employee directory
//!
//! This crate provides the department tree, person filtering, data access
//! and HTTP API behind the people directory, plus the content import job.

pub mod config;
pub mod db;
pub mod directory;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod import;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use directory::{DepartmentForest, DepartmentNode, DepartmentRef, DepartmentRow};
pub use state::AppState;

//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed write/view models passed to and returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `hackpub::db`, which re-exports the
//! repository API and commonly used models.

pub mod model;
pub mod repo;

// Re-export the repository API at `crate::db::*`.
pub use repo::*;

// Surface view models used by callers (e.g., recovery worker).
pub use model::{RetryTask, WriteProject};

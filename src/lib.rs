//! hackpub: a publish pipeline for browser-authored HTML pages.
//!
//! A publish runs through fixed stages: metadata extraction, operation
//! resolution, the project-store write, duplicate-title handling, URL
//! assignment, the object-store put, and catalog sync. The [`publish`]
//! module owns the pass; [`recovery`] repairs publishes that failed after
//! their content was saved.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod location;
pub mod meta;
pub mod model;
pub mod publish;
pub mod recovery;
pub mod resolve;
pub mod slug;
pub mod store;

pub use error::PublishError;
pub use publish::Publisher;

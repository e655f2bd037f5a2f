//! Driftmail Storage - Transactional persistence for the campaign
//! scheduling domain.
//!
//! This crate is the Store collaborator: campaigns, scenarios,
//! templates, groups/targets, sending profiles, results, and mail-log
//! queue entries, all behind a Postgres connection pool.

pub mod db;
pub mod models;
pub mod repository;

pub use db::{Database, DatabasePool};
pub use models::*;
pub use repository::*;

//! Thin operational API: a health check plus the endpoints that trigger
//! the scheduling core from outside a process, `schedule`, `complete`,
//! and `launch`. A full CRUD surface over campaigns, scenarios, groups,
//! and templates lives in front of this as a separate collaborator;
//! this crate is not that surface, it's the operational seam into
//! `driftmail-core`.

pub mod handlers;
pub mod routes;

pub use routes::{create_router, ApiState};

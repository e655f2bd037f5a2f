//! API routes: the thin operational surface over the scheduling core.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use driftmail_core::{CampaignScheduler, Dispatcher};
use driftmail_storage::DatabasePool;
use tower_http::trace::TraceLayer;

use crate::handlers::{complete, health, launch, schedule};

/// Shared state for every handler: the Scheduler, the Dispatcher (for
/// `LaunchCampaign`), and the pool (for the health check).
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<CampaignScheduler>,
    pub dispatcher: Arc<Dispatcher>,
    pub db: DatabasePool,
}

/// Create the API router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaigns/schedule", post(schedule))
        .route("/campaigns/:id/complete", post(complete))
        .route("/campaigns/:id/launch", post(launch))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

//! Driftmail - campaign scheduler and send worker entry point

use anyhow::Result;
use driftmail_api::ApiState;
use driftmail_common::config::Config;
use driftmail_core::{CampaignScheduler, Dispatcher, EventLog, LettreTransport};
use driftmail_storage::{DatabasePool, EventRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Driftmail...");

    let config = Config::load()?;

    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    db_pool.migrate().await?;
    info!("Database migrations completed");

    let pool = db_pool.pool().clone();

    let scheduler = Arc::new(CampaignScheduler::new(pool.clone()));

    let events = Arc::new(EventLog::new(EventRepository::new(pool.clone()), Vec::new()));
    let transport = Arc::new(LettreTransport::new());
    let dispatcher = Arc::new(Dispatcher::new(
        pool.clone(),
        events,
        transport,
        config.dispatcher.batch_size,
        config.dispatcher.concurrency_limit,
    ));

    // Start the dispatch loop
    let dispatcher_handle = {
        let dispatcher = dispatcher.clone();
        let poll_interval = Duration::from_secs(config.dispatcher.poll_interval_secs);
        tokio::spawn(async move {
            dispatcher.run(poll_interval).await;
        })
    };

    // Start the thin operational API
    let api_handle = {
        let state = ApiState { scheduler, dispatcher, db: db_pool.clone() };
        let bind_address = config.server.bind_address.clone();
        let port = config.server.port;
        tokio::spawn(async move {
            let app = driftmail_api::create_router(state);
            let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_address, port))
                .await
                .expect("failed to bind API server");
            info!("Starting operational API on {}:{}", bind_address, port);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("Driftmail started successfully");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    dispatcher_handle.abort();
    api_handle.abort();

    info!("Driftmail shutdown complete");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftmail=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}

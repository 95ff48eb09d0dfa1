use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::{db::SurrealDbClient, types::user::User},
    utils::config::get_config,
};
use import_pipeline::{fetcher::SimulatedVideoClient, ImportPipeline, ImportWorkerPool};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    // Ensure db is initialized
    db.ensure_initialized().await?;

    if let Some(api_key) = User::ensure_bootstrap_admin(
        &db,
        &config.bootstrap_admin_email,
        config.bootstrap_api_key.clone(),
    )
    .await?
    {
        warn!(
            email = %config.bootstrap_admin_email,
            %api_key,
            "Created bootstrap admin account; store this API key"
        );
    }

    let fetcher = Arc::new(match config.fetcher_seed {
        Some(seed) => SimulatedVideoClient::from_seed(seed),
        None => SimulatedVideoClient::new(),
    });
    let pipeline = Arc::new(ImportPipeline::new(
        db.clone(),
        fetcher,
        Duration::from_secs(config.fetch_timeout_secs),
    ));
    let pool = ImportWorkerPool::start(pipeline, config.import_workers, config.import_queue_depth);

    let api_state = ApiState::new(db, config.clone(), pool.dispatcher());

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The server (and every dispatcher clone) is gone; drain queued jobs
    // before exiting.
    pool.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received");
}

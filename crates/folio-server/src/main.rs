use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use folio_client::Engine;
use folio_core::{CrawlConfig, JobManager};
use folio_db::{Database, DatabaseConfig};
use folio_server::routes;
use folio_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("folio=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("FOLIO_SERVER_API_KEY")
        .ok()
        .filter(|key| !key.is_empty());
    if api_key.is_none() {
        tracing::warn!("FOLIO_SERVER_API_KEY is not set; crawl endpoints are unauthenticated");
    }
    let port = std::env::var("FOLIO_SERVER_PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let config = CrawlConfig::from_env()?;
    let engine = Engine::from_env(config.request_timeout)?;
    tracing::info!(
        engine = engine.name(),
        max_requests = config.max_requests,
        concurrency = config.concurrency,
        "Crawl policy loaded"
    );

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let jobs = JobManager::new(db.job_repo(), engine, db.product_repo(), config);
    jobs.recover_orphans().await?;

    let state = Arc::new(AppState {
        db,
        jobs: jobs.clone(),
        api_key,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    jobs.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

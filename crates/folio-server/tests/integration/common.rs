use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

use folio_client::Engine;
use folio_core::{CrawlConfig, JobManager};
use folio_db::Database;
use folio_server::routes;
use folio_server::state::{AppState, ServerJobs};

pub const TEST_API_KEY: &str = "test-secret-key";

/// Target the SSRF guard rejects, so crawls end without network traffic.
pub const UNREACHABLE_TARGET: &str = "http://127.0.0.1:9/collections/books";

pub struct TestApp {
    pub router: Router,
    pub jobs: ServerJobs,
    _container: ContainerAsync<GenericImage>,
}

/// App whose `/v1` routes require [`TEST_API_KEY`].
pub async fn setup_test_app() -> TestApp {
    build_app(Some(TEST_API_KEY.to_string())).await
}

/// App running without an API key.
pub async fn setup_test_app_no_auth() -> TestApp {
    build_app(None).await
}

async fn build_app(api_key: Option<String>) -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "folio_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/folio_test");

    let db = Database::from_pool(retry_connect(&url).await);
    db.migrate().await.expect("Failed to run migrations");

    let config = CrawlConfig::default()
        .with_request_timeout(Duration::from_secs(5))
        .with_max_retries(0);
    let jobs = JobManager::new(
        db.job_repo(),
        Engine::http(Duration::from_secs(5)),
        db.product_repo(),
        config,
    );

    let state = Arc::new(AppState {
        db,
        jobs: jobs.clone(),
        api_key,
    });

    TestApp {
        router: routes::router(state),
        jobs,
        _container: container,
    }
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}

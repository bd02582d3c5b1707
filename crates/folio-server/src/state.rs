use folio_client::Engine;
use folio_core::JobManager;
use folio_db::{CrawlJobRepository, Database, ProductRepository};

/// Job manager wired to PostgreSQL and the configured rendering engine.
pub type ServerJobs = JobManager<CrawlJobRepository, Engine, ProductRepository>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub jobs: ServerJobs,
    /// Bearer token guarding the `/v1` routes (`None` = open API).
    pub api_key: Option<String>,
}

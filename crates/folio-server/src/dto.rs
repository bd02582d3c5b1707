use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use folio_core::job::CrawlJob;

// ---------------------------------------------------------------------------
// Crawl jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCrawlJobRequest {
    /// Category listing page to crawl
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateCrawlJobResponse {
    pub message: String,
    pub job_id: Uuid,
    pub url: String,
    pub status: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlJobResponse {
    pub id: Uuid,
    pub target_url: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub items_found: u64,
    pub created_at: DateTime<Utc>,
}

impl From<CrawlJob> for CrawlJobResponse {
    fn from(job: CrawlJob) -> Self {
        Self {
            id: job.id,
            target_url: job.target_url,
            status: job.status.to_string(),
            started_at: job.started_at,
            finished_at: job.finished_at,
            error: job.error,
            items_found: job.items_found,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListCrawlJobsQuery {
    /// PENDING, RUNNING, COMPLETED or FAILED
    pub status: Option<String>,
    /// Defaults to 20, capped at 100
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlJobListResponse {
    pub jobs: Vec<CrawlJobResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::job::{CrawlJob, CrawlOutcome, JobStatus};
use folio_core::job_store::JobStore;

/// PostgreSQL-backed crawl job records.
///
/// The terminal write is guarded in SQL (`status NOT IN (...)`), so a job
/// that already finished is never overwritten even by a stale writer.
#[derive(Clone)]
pub struct CrawlJobRepository {
    pool: Pool<Postgres>,
}

impl CrawlJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_by_status(&self, status: JobStatus) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM crawl_jobs WHERE status = $1"#)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct CrawlJobRow {
    id: Uuid,
    target_url: String,
    status: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
    items_found: i64,
    created_at: DateTime<Utc>,
}

impl From<CrawlJobRow> for CrawlJob {
    fn from(row: CrawlJobRow) -> Self {
        CrawlJob {
            id: row.id,
            target_url: row.target_url,
            status: row.status.parse().unwrap_or(JobStatus::Pending),
            started_at: row.started_at,
            finished_at: row.finished_at,
            error: row.error,
            items_found: row.items_found.max(0) as u64,
            created_at: row.created_at,
        }
    }
}

impl JobStore for CrawlJobRepository {
    async fn create_job(&self, target_url: &str) -> Result<CrawlJob, AppError> {
        let row = sqlx::query_as::<_, CrawlJobRow>(
            r#"
            INSERT INTO crawl_jobs (target_url, status, started_at)
            VALUES ($1, 'RUNNING', NOW())
            RETURNING *
            "#,
        )
        .bind(target_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<CrawlJob>, AppError> {
        let row = sqlx::query_as::<_, CrawlJobRow>(r#"SELECT * FROM crawl_jobs WHERE id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn finish_job(&self, job_id: Uuid, outcome: &CrawlOutcome) -> Result<bool, AppError> {
        let (status, items_found, error) = match outcome {
            CrawlOutcome::Completed { items_found } => {
                (JobStatus::Completed, Some(*items_found as i64), None)
            }
            CrawlOutcome::Failed { error } => (JobStatus::Failed, None, Some(error.as_str())),
        };

        let result = sqlx::query(
            r#"
            UPDATE crawl_jobs
            SET status = $2,
                finished_at = NOW(),
                items_found = COALESCE($3, items_found),
                error = $4
            WHERE id = $1 AND status NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(items_found)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<CrawlJob>, AppError> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, CrawlJobRow>(
                r#"
                SELECT * FROM crawl_jobs
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(status.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, CrawlJobRow>(
                r#"
                SELECT * FROM crawl_jobs
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fail_orphaned_jobs(&self, error: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE crawl_jobs
            SET status = 'FAILED', finished_at = NOW(), error = $1
            WHERE status IN ('PENDING', 'RUNNING')
            "#,
        )
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

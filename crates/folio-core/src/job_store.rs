use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::job::{CrawlJob, CrawlOutcome, JobStatus};

/// Persistent record of crawl jobs.
///
/// Only the job lifecycle manager writes through this trait.
pub trait JobStore: Send + Sync + Clone {
    /// Record a new job in `RUNNING` state with `started_at = now`.
    fn create_job(
        &self,
        target_url: &str,
    ) -> impl Future<Output = Result<CrawlJob, AppError>> + Send;

    fn get_job(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Option<CrawlJob>, AppError>> + Send;

    /// Write the terminal state.
    ///
    /// Returns `false` without changing anything if the job is unknown or
    /// already terminal, so a terminal snapshot is never overwritten.
    fn finish_job(
        &self,
        job_id: Uuid,
        outcome: &CrawlOutcome,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Most recent jobs first.
    fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CrawlJob>, AppError>> + Send;

    /// Fail every non-terminal job left behind by a previous process.
    fn fail_orphaned_jobs(
        &self,
        error: &str,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}

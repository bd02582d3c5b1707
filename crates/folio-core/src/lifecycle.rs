//! Job lifecycle: create a job, crawl in the background, record the outcome.
//!
//! The manager is the only writer of a job after creation. A run never
//! touches the job record; it returns a [`CrawlSummary`] or an error and the
//! manager turns that into exactly one terminal write.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use url::Url;
use uuid::Uuid;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::job::{CrawlJob, CrawlOutcome, JobStatus};
use crate::job_store::JobStore;
use crate::reporter::{CrawlEvent, CrawlReporter, TracingCrawlReporter};
use crate::runner::{CrawlRunner, CrawlSummary};
use crate::throttle::ThrottledRenderer;
use crate::traits::{CatalogStore, RendererFactory};

/// Upper bound for [`JobManager::list_jobs`].
pub const MAX_LIST_LIMIT: usize = 100;

/// Attempts at the terminal write before the job is left to orphan recovery.
const FINISH_ATTEMPTS: u32 = 3;
const FINISH_BACKOFF: Duration = Duration::from_millis(50);

/// Error recorded on jobs a previous process left running.
pub const ORPHANED_JOB_ERROR: &str = "interrupted by restart";

/// Parse and check a caller-supplied crawl target.
pub fn validate_target_url(raw: &str) -> Result<Url, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError("url is required".into()));
    }
    let url =
        Url::parse(raw).map_err(|e| AppError::ValidationError(format!("invalid url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ValidationError(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::ValidationError("url has no host".into()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct JobManager<J, F, S> {
    jobs: J,
    renderers: F,
    store: S,
    config: CrawlConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
    reporter: Arc<dyn CrawlReporter>,
}

impl<J, F, S> JobManager<J, F, S>
where
    J: JobStore + 'static,
    F: RendererFactory + 'static,
    S: CatalogStore + 'static,
{
    pub fn new(jobs: J, renderers: F, store: S, config: CrawlConfig) -> Self {
        Self {
            jobs,
            renderers,
            store,
            config,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            reporter: Arc::new(TracingCrawlReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CrawlReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Record a new `RUNNING` job and crawl it in the background.
    ///
    /// Returns as soon as the job is stored; poll [`Self::get_job`] for
    /// progress. Only validation and the initial write fail synchronously.
    pub async fn start_job(&self, target_url: &str) -> Result<CrawlJob, AppError> {
        let seed = validate_target_url(target_url)?;
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled("by shutdown".into()));
        }

        let job = self.jobs.create_job(target_url.trim()).await?;
        self.reporter.report(CrawlEvent::JobStarted {
            job_id: job.id,
            url: job.target_url.as_str(),
        });

        let manager = self.clone();
        let job_id = job.id;
        self.tracker.spawn(async move {
            manager.run_job(job_id, seed).await;
        });

        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<CrawlJob>, AppError> {
        self.jobs.get_job(job_id).await
    }

    /// Most recent jobs first; `limit` is clamped to `1..=100`.
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<CrawlJob>, AppError> {
        self.jobs
            .list_jobs(status, limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }

    /// Fail jobs left `RUNNING` by a previous process. Call once at startup,
    /// before any new job starts, and only from the process that owns the
    /// job table: every non-terminal job in the store is failed, including
    /// jobs another live manager is still running.
    pub async fn recover_orphans(&self) -> Result<u64, AppError> {
        let failed = self.jobs.fail_orphaned_jobs(ORPHANED_JOB_ERROR).await?;
        if failed > 0 {
            tracing::warn!(failed, "Marked orphaned crawl jobs as failed");
        }
        Ok(failed)
    }

    /// Wait for every started job to reach a terminal state.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting jobs, cancel running crawls and wait for their
    /// terminal writes.
    pub async fn shutdown(&self) {
        tracing::info!(running = self.tracker.len(), "Shutting down crawl jobs");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn run_job(self, job_id: Uuid, seed: Url) {
        let worker = self.clone();
        let cancel = self.cancel.clone();
        // A separate task so a panicking crawl still gets a terminal write.
        let handle = tokio::spawn(async move { worker.crawl(&seed, &cancel).await });

        let outcome = match handle.await {
            Ok(Ok(summary)) => CrawlOutcome::Completed {
                items_found: summary.items_found,
            },
            Ok(Err(e)) => CrawlOutcome::failed(e.to_string()),
            Err(e) => CrawlOutcome::failed(format!("crawl task aborted: {e}")),
        };
        self.complete(job_id, outcome).await;
    }

    async fn crawl(&self, seed: &Url, cancel: &CancellationToken) -> Result<CrawlSummary, AppError> {
        let renderer = self.renderers.launch().await?;
        let renderer = ThrottledRenderer::new(renderer, self.config.throttle);
        let runner = CrawlRunner::new(renderer, self.store.clone(), self.config.clone());
        runner.run(seed, cancel, self.reporter.as_ref()).await
    }

    /// The single terminal write for a job.
    async fn complete(&self, job_id: Uuid, outcome: CrawlOutcome) {
        match &outcome {
            CrawlOutcome::Completed { items_found } => {
                self.reporter.report(CrawlEvent::JobCompleted {
                    job_id,
                    items_found: *items_found,
                });
            }
            CrawlOutcome::Failed { error } => {
                self.reporter.report(CrawlEvent::JobFailed {
                    job_id,
                    error: error.as_str(),
                });
            }
        }

        for attempt in 1..=FINISH_ATTEMPTS {
            match self.jobs.finish_job(job_id, &outcome).await {
                Ok(true) => return,
                Ok(false) => {
                    tracing::warn!(%job_id, "Job was already terminal, outcome discarded");
                    return;
                }
                Err(e) if attempt < FINISH_ATTEMPTS => {
                    tracing::warn!(%job_id, attempt, error = %e, "Failed to record job outcome, retrying");
                    tokio::time::sleep(FINISH_BACKOFF * attempt).await;
                }
                Err(e) => {
                    tracing::error!(%job_id, attempts = attempt, error = %e, "Giving up on recording job outcome");
                }
            }
        }
    }
}

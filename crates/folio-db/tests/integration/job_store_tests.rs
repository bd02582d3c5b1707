use folio_core::job::{CrawlOutcome, JobStatus};
use folio_core::job_store::JobStore;
use folio_db::CrawlJobRepository;

use crate::integration::common::setup_test_db;

const TARGET: &str = "https://shop.test/collections/fiction";

#[tokio::test]
async fn create_job_starts_running() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);

    let job = repo.create_job(TARGET).await.unwrap();

    assert_eq!(job.target_url, TARGET);
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.items_found, 0);
    assert!(job.finished_at.is_none());
    assert!(job.error.is_none());

    let fetched = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, job.id);
    assert_eq!(fetched.status, JobStatus::Running);
}

#[tokio::test]
async fn get_unknown_job_is_none() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);

    assert!(repo.get_job(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn finish_job_completed_records_items() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);
    let job = repo.create_job(TARGET).await.unwrap();

    let written = repo
        .finish_job(job.id, &CrawlOutcome::Completed { items_found: 12 })
        .await
        .unwrap();
    assert!(written);

    let done = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.items_found, 12);
    assert!(done.finished_at.is_some());
    assert!(done.error.is_none());
}

#[tokio::test]
async fn terminal_job_is_never_overwritten() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);
    let job = repo.create_job(TARGET).await.unwrap();

    repo.finish_job(job.id, &CrawlOutcome::failed("browser failed to launch"))
        .await
        .unwrap();
    let first = repo.get_job(job.id).await.unwrap().unwrap();

    let written = repo
        .finish_job(job.id, &CrawlOutcome::Completed { items_found: 3 })
        .await
        .unwrap();
    assert!(!written);

    let second = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(second.status, JobStatus::Failed);
    assert_eq!(second.error.as_deref(), Some("browser failed to launch"));
    assert_eq!(second.finished_at, first.finished_at);
    assert_eq!(second.items_found, 0);
}

#[tokio::test]
async fn list_jobs_by_status_newest_first() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);

    let a = repo.create_job("https://a.test/").await.unwrap();
    let b = repo.create_job("https://b.test/").await.unwrap();
    let c = repo.create_job("https://c.test/").await.unwrap();
    repo.finish_job(b.id, &CrawlOutcome::Completed { items_found: 1 })
        .await
        .unwrap();

    let all = repo.list_jobs(None, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let running = repo.list_jobs(Some(JobStatus::Running), 10).await.unwrap();
    let ids: Vec<_> = running.iter().map(|j| j.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id) && ids.contains(&c.id));

    let limited = repo.list_jobs(None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    assert_eq!(repo.count_by_status(JobStatus::Completed).await.unwrap(), 1);
}

#[tokio::test]
async fn fail_orphaned_jobs_only_touches_running() {
    let (pool, _container) = setup_test_db().await;
    let repo = CrawlJobRepository::new(pool);

    let orphan = repo.create_job(TARGET).await.unwrap();
    let done = repo.create_job(TARGET).await.unwrap();
    repo.finish_job(done.id, &CrawlOutcome::Completed { items_found: 2 })
        .await
        .unwrap();

    let failed = repo.fail_orphaned_jobs("interrupted by restart").await.unwrap();
    assert_eq!(failed, 1);

    let orphan = repo.get_job(orphan.id).await.unwrap().unwrap();
    assert_eq!(orphan.status, JobStatus::Failed);
    assert_eq!(orphan.error.as_deref(), Some("interrupted by restart"));
    assert!(orphan.finished_at.is_some());

    let done = repo.get_job(done.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
}

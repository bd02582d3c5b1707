//! In-process stores for runs that do not persist anything, and for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{CrawlJob, CrawlOutcome, JobStatus};
use crate::job_store::JobStore;
use crate::models::{
    PRICE_PLACEHOLDER, ProductDetailDraft, ProductDetailRecord, ProductDraft, ProductRecord,
};
use crate::traits::CatalogStore;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::DatabaseError("in-memory store lock poisoned".into()))
}

#[derive(Debug, Default)]
struct Catalog {
    /// Keyed by product URL.
    products: HashMap<String, ProductRecord>,
    /// Keyed by product id.
    details: HashMap<Uuid, ProductDetailRecord>,
}

/// Catalog store backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<Mutex<Catalog>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_count(&self) -> usize {
        self.inner.lock().map(|c| c.products.len()).unwrap_or(0)
    }

    /// All products, ordered by URL.
    pub fn products(&self) -> Vec<ProductRecord> {
        let mut products: Vec<_> = self
            .inner
            .lock()
            .map(|c| c.products.values().cloned().collect())
            .unwrap_or_default();
        products.sort_by(|a, b| a.product_url.cmp(&b.product_url));
        products
    }
}

impl CatalogStore for MemoryCatalogStore {
    async fn upsert_product(&self, draft: &ProductDraft) -> Result<ProductRecord, AppError> {
        let mut catalog = lock(&self.inner)?;
        let now = Utc::now();

        let record = match catalog.products.get_mut(&draft.product_url) {
            Some(existing) => {
                existing.title = draft.title.clone();
                existing.category = draft.category.clone();
                if let Some(price) = &draft.price {
                    existing.price = price.clone();
                }
                if draft.author.is_some() {
                    existing.author = draft.author.clone();
                }
                if draft.image_url.is_some() {
                    existing.image_url = draft.image_url.clone();
                }
                if draft.condition.is_some() {
                    existing.condition = draft.condition.clone();
                }
                if draft.description.is_some() {
                    existing.description = draft.description.clone();
                }
                existing.scraped_at = now;
                existing.clone()
            }
            None => {
                let record = ProductRecord {
                    id: Uuid::new_v4(),
                    title: draft.title.clone(),
                    author: draft.author.clone(),
                    price: draft
                        .price
                        .clone()
                        .unwrap_or_else(|| PRICE_PLACEHOLDER.to_string()),
                    image_url: draft.image_url.clone(),
                    product_url: draft.product_url.clone(),
                    category: draft.category.clone(),
                    condition: draft.condition.clone(),
                    description: draft.description.clone(),
                    scraped_at: now,
                };
                catalog
                    .products
                    .insert(draft.product_url.clone(), record.clone());
                record
            }
        };
        Ok(record)
    }

    async fn upsert_detail(
        &self,
        product_id: Uuid,
        detail: &ProductDetailDraft,
    ) -> Result<ProductDetailRecord, AppError> {
        let mut catalog = lock(&self.inner)?;
        if !catalog.products.values().any(|p| p.id == product_id) {
            return Err(AppError::DatabaseError(format!(
                "product {product_id} does not exist"
            )));
        }

        let id = catalog
            .details
            .get(&product_id)
            .map(|d| d.id)
            .unwrap_or_else(Uuid::new_v4);
        let record = ProductDetailRecord {
            id,
            product_id,
            description: detail.description.clone(),
            specs: detail.specs.clone(),
            ratings_avg: detail.ratings_avg,
            reviews_count: detail.reviews_count,
            updated_at: Utc::now(),
        };
        catalog.details.insert(product_id, record.clone());
        Ok(record)
    }

    async fn get_product_by_url(&self, product_url: &str) -> Result<Option<ProductRecord>, AppError> {
        Ok(lock(&self.inner)?.products.get(product_url).cloned())
    }

    async fn get_detail(&self, product_id: Uuid) -> Result<Option<ProductDetailRecord>, AppError> {
        Ok(lock(&self.inner)?.details.get(&product_id).cloned())
    }
}

/// Job store backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, CrawlJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job as-is, e.g. one left behind by a previous process.
    pub fn insert(&self, job: CrawlJob) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(job.id, job);
        }
    }
}

impl JobStore for MemoryJobStore {
    async fn create_job(&self, target_url: &str) -> Result<CrawlJob, AppError> {
        let job = CrawlJob::started(target_url);
        lock(&self.jobs)?.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<CrawlJob>, AppError> {
        Ok(lock(&self.jobs)?.get(&job_id).cloned())
    }

    async fn finish_job(&self, job_id: Uuid, outcome: &CrawlOutcome) -> Result<bool, AppError> {
        let mut jobs = lock(&self.jobs)?;
        Ok(jobs
            .get_mut(&job_id)
            .is_some_and(|job| job.finish(outcome, Utc::now())))
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<CrawlJob>, AppError> {
        let mut jobs: Vec<CrawlJob> = lock(&self.jobs)?
            .values()
            .filter(|job| status.is_none_or(|s| job.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn fail_orphaned_jobs(&self, error: &str) -> Result<u64, AppError> {
        let mut jobs = lock(&self.jobs)?;
        let outcome = CrawlOutcome::failed(error);
        let now = Utc::now();
        let failed = jobs
            .values_mut()
            .map(|job| job.finish(&outcome, now))
            .filter(|failed| *failed)
            .count();
        Ok(failed as u64)
    }
}

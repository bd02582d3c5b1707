use uuid::Uuid;

use crate::extract::ListingStats;
use crate::request::RequestRole;

/// Events emitted by crawl runs and the job manager for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    JobStarted {
        job_id: Uuid,
        url: &'a str,
    },
    RunStarted {
        url: &'a str,
        max_requests: usize,
        concurrency: usize,
    },
    RequestStarted {
        url: &'a str,
        role: RequestRole,
        attempt: u32,
    },
    ListingExtracted {
        url: &'a str,
        products: usize,
        links_found: usize,
    },
    /// A listing page yielded nothing; the stats say why.
    ListingEmpty {
        url: &'a str,
        stats: ListingStats,
        html_bytes: usize,
    },
    DetailSaved {
        url: &'a str,
        product_id: Uuid,
    },
    RequestFailed {
        url: &'a str,
        role: RequestRole,
        error: &'a str,
        will_retry: bool,
    },
    BudgetExhausted {
        max_requests: usize,
        pending: usize,
    },
    RunFinished {
        url: &'a str,
        items_found: u64,
        requests_handled: usize,
        requests_failed: usize,
    },
    JobCompleted {
        job_id: Uuid,
        items_found: u64,
    },
    JobFailed {
        job_id: Uuid,
        error: &'a str,
    },
}

/// Trait for receiving crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::JobStarted { job_id, url } => {
                tracing::info!(%job_id, %url, "Crawl job started");
            }
            CrawlEvent::RunStarted {
                url,
                max_requests,
                concurrency,
            } => {
                tracing::info!(%url, max_requests, concurrency, "Crawl run started");
            }
            CrawlEvent::RequestStarted { url, role, attempt } => {
                tracing::debug!(%url, %role, attempt, "Processing request");
            }
            CrawlEvent::ListingExtracted {
                url,
                products,
                links_found,
            } => {
                tracing::info!(%url, products, links_found, "Listing page extracted");
            }
            CrawlEvent::ListingEmpty {
                url,
                stats,
                html_bytes,
            } => {
                tracing::warn!(
                    %url,
                    containers_scanned = stats.containers_scanned,
                    skipped_no_price = stats.skipped_no_price,
                    html_bytes,
                    "No products found on listing page"
                );
            }
            CrawlEvent::DetailSaved { url, product_id } => {
                tracing::info!(%url, %product_id, "Product detail saved");
            }
            CrawlEvent::RequestFailed {
                url,
                role,
                error,
                will_retry,
            } => {
                tracing::warn!(%url, %role, %error, will_retry, "Request failed");
            }
            CrawlEvent::BudgetExhausted {
                max_requests,
                pending,
            } => {
                tracing::info!(max_requests, pending, "Request budget exhausted");
            }
            CrawlEvent::RunFinished {
                url,
                items_found,
                requests_handled,
                requests_failed,
            } => {
                tracing::info!(
                    %url,
                    items_found,
                    requests_handled,
                    requests_failed,
                    "Crawl run finished"
                );
            }
            CrawlEvent::JobCompleted {
                job_id,
                items_found,
            } => {
                tracing::info!(%job_id, items_found, "Crawl job completed");
            }
            CrawlEvent::JobFailed { job_id, error } => {
                tracing::error!(%job_id, %error, "Crawl job failed");
            }
        }
    }
}

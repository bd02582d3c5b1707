//! Bounded breadth-first crawl over one seed.
//!
//! A run owns its [`Frontier`]. Up to `concurrency` page futures are polled
//! at once from a single task; each one reports its discoveries back to the
//! loop, which is the only code touching the queue. Page failures are
//! logged and either retried or counted, never propagated.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::extract::{DetailExtraction, extract_detail, extract_listing};
use crate::frontier::Frontier;
use crate::models::ProductDraft;
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::request::{CrawlRequest, RequestRole, unique_key};
use crate::scope::LinkScope;
use crate::traits::{CatalogStore, PageRenderer};

/// Totals for a run that reached its natural end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Distinct products persisted during the run.
    pub items_found: u64,
    pub requests_handled: usize,
    pub requests_failed: usize,
    /// The run stopped with requests still queued.
    pub budget_exhausted: bool,
}

/// Distinct product URLs persisted by concurrently running page handlers.
#[derive(Debug, Default)]
struct ItemTally {
    urls: Mutex<HashSet<String>>,
    count: AtomicU64,
}

impl ItemTally {
    fn record(&self, product_url: &str) {
        let newly_seen = self
            .urls
            .lock()
            .map(|mut urls| urls.insert(product_url.to_string()))
            .unwrap_or(false);
        if newly_seen {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn total(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

pub struct CrawlRunner<R, S> {
    renderer: R,
    store: S,
    config: CrawlConfig,
}

impl<R, S> CrawlRunner<R, S>
where
    R: PageRenderer,
    S: CatalogStore,
{
    pub fn new(renderer: R, store: S, config: CrawlConfig) -> Self {
        Self {
            renderer,
            store,
            config,
        }
    }

    /// Crawl from `seed` until the frontier drains or the budget is spent.
    ///
    /// Only a seed outside any domain or a cancellation ends in `Err`.
    pub async fn run<CR>(
        &self,
        seed: &Url,
        cancel: &CancellationToken,
        reporter: &CR,
    ) -> Result<CrawlSummary, AppError>
    where
        CR: CrawlReporter + ?Sized,
    {
        let scope = LinkScope::for_seed(seed)?;
        let tally = ItemTally::default();
        let mut frontier = Frontier::new(self.config.max_requests);
        frontier.push(CrawlRequest::seed(seed.clone()));

        reporter.report(CrawlEvent::RunStarted {
            url: seed.as_str(),
            max_requests: self.config.max_requests,
            concurrency: self.config.concurrency,
        });

        let mut in_flight = FuturesUnordered::new();
        let mut summary = CrawlSummary::default();
        let mut cancelled = false;

        loop {
            while in_flight.len() < self.config.concurrency.max(1) {
                let Some(request) = frontier.next() else {
                    if frontier.is_exhausted() && !summary.budget_exhausted {
                        summary.budget_exhausted = true;
                        reporter.report(CrawlEvent::BudgetExhausted {
                            max_requests: self.config.max_requests,
                            pending: frontier.pending(),
                        });
                    }
                    break;
                };
                in_flight.push(self.process(request, &scope, &tally, reporter));
            }

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    cancelled = true;
                    None
                }
                next = in_flight.next() => next,
            };
            let Some((request, result)) = next else {
                break;
            };

            match result {
                Ok(links) => {
                    summary.requests_handled += 1;
                    for url in links {
                        frontier.push(CrawlRequest::detail(url, &request.url));
                    }
                }
                Err(e) => {
                    let will_retry =
                        e.is_retryable() && request.retries < self.config.max_retries;
                    let error = e.to_string();
                    reporter.report(CrawlEvent::RequestFailed {
                        url: request.url.as_str(),
                        role: request.role,
                        error: error.as_str(),
                        will_retry,
                    });
                    if will_retry {
                        frontier.retry(request);
                    } else {
                        summary.requests_failed += 1;
                    }
                }
            }
        }
        drop(in_flight);

        summary.items_found = tally.total();
        if cancelled {
            return Err(AppError::Cancelled("by shutdown".into()));
        }

        reporter.report(CrawlEvent::RunFinished {
            url: seed.as_str(),
            items_found: summary.items_found,
            requests_handled: summary.requests_handled,
            requests_failed: summary.requests_failed,
        });
        Ok(summary)
    }

    /// Load and handle one request under the per-request timeout.
    ///
    /// Returns the request back so the loop can retry it.
    async fn process<CR>(
        &self,
        request: CrawlRequest,
        scope: &LinkScope,
        tally: &ItemTally,
        reporter: &CR,
    ) -> (CrawlRequest, Result<Vec<Url>, AppError>)
    where
        CR: CrawlReporter + ?Sized,
    {
        reporter.report(CrawlEvent::RequestStarted {
            url: request.url.as_str(),
            role: request.role,
            attempt: request.retries + 1,
        });

        let work = async {
            match request.role {
                RequestRole::Listing => {
                    self.handle_listing(&request, scope, tally, reporter)
                        .await
                }
                RequestRole::Detail => self.handle_detail(&request, tally, reporter).await,
            }
        };
        let result = tokio::time::timeout(self.config.request_timeout, work)
            .await
            .unwrap_or_else(|_| Err(AppError::Timeout(self.config.request_timeout.as_secs())));

        (request, result)
    }

    /// Discover detail links first, then harvest and save the page's tiles.
    async fn handle_listing<CR>(
        &self,
        request: &CrawlRequest,
        scope: &LinkScope,
        tally: &ItemTally,
        reporter: &CR,
    ) -> Result<Vec<Url>, AppError>
    where
        CR: CrawlReporter + ?Sized,
    {
        let page = self.renderer.render(request).await?;
        let links = scope.discover(&page.html, &page.url);
        let extraction = extract_listing(&page.html, &page.url);
        let url = request.url.as_str();

        if extraction.candidates.is_empty() {
            reporter.report(CrawlEvent::ListingEmpty {
                url,
                stats: extraction.stats,
                html_bytes: page.html.len(),
            });
        }

        let mut saved = 0;
        for candidate in extraction.candidates {
            let draft = candidate.into_draft(&self.config.category);
            // One bad record must not lose the page's discovered links.
            match self.store.upsert_product(&draft).await {
                Ok(product) => {
                    tally.record(&product.product_url);
                    saved += 1;
                }
                Err(e) => {
                    tracing::warn!(product_url = %draft.product_url, error = %e, "Failed to save listing product");
                }
            }
        }

        reporter.report(CrawlEvent::ListingExtracted {
            url,
            products: saved,
            links_found: links.len(),
        });
        Ok(links)
    }

    /// Save the product first to learn its id, then its detail record.
    async fn handle_detail<CR>(
        &self,
        request: &CrawlRequest,
        tally: &ItemTally,
        reporter: &CR,
    ) -> Result<Vec<Url>, AppError>
    where
        CR: CrawlReporter + ?Sized,
    {
        let page = self.renderer.render(request).await?;
        let DetailExtraction { title, detail } = extract_detail(&page.html);

        let draft = ProductDraft::new(title, unique_key(&request.url), &self.config.category);
        let product = self.store.upsert_product(&draft).await?;
        self.store.upsert_detail(product.id, &detail).await?;
        tally.record(&product.product_url);

        reporter.report(CrawlEvent::DetailSaved {
            url: request.url.as_str(),
            product_id: product.id,
        });
        Ok(Vec::new())
    }
}

//! Test utilities: scripted renderers, recording reporters and page fixtures.
//!
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing test
//! assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{CrawlJob, CrawlOutcome, JobStatus};
use crate::job_store::JobStore;
use crate::memory::MemoryJobStore;
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::request::CrawlRequest;
use crate::traits::{PageRenderer, RenderedPage, RendererFactory};

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Scripted {
    Html(String),
    Fail(Arc<dyn Fn() -> AppError + Send + Sync>),
}

/// Renderer that answers from a per-URL script.
///
/// Each URL holds a queue of responses; the last one repeats. Unknown URLs
/// answer HTTP 404.
#[derive(Clone, Default)]
pub struct MockRenderer {
    script: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    panics: bool,
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, response: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(normalize(url))
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.push(url, Scripted::Html(html.to_string()))
    }

    pub fn with_error(
        self,
        url: &str,
        error: impl Fn() -> AppError + Send + Sync + 'static,
    ) -> Self {
        self.push(url, Scripted::Fail(Arc::new(error)))
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic on every render.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// URLs rendered so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageRenderer for MockRenderer {
    async fn render(&self, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        let key = request.url.as_str().to_string();
        self.calls.lock().unwrap().push(key.clone());

        if self.panics {
            panic!("renderer exploded on {key}");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            script.get_mut(&key).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match next {
            Some(Scripted::Html(html)) => Ok(RenderedPage {
                url: request.url.clone(),
                html,
            }),
            Some(Scripted::Fail(error)) => Err(error()),
            None => Err(AppError::HttpStatus {
                status: 404,
                url: key,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockRendererFactory
// ---------------------------------------------------------------------------

/// Factory that hands out clones of one [`MockRenderer`], or fails to launch.
#[derive(Clone)]
pub struct MockRendererFactory {
    renderer: MockRenderer,
    launch_error: Option<String>,
    launches: Arc<AtomicUsize>,
}

impl MockRendererFactory {
    pub fn new(renderer: MockRenderer) -> Self {
        Self {
            renderer,
            launch_error: None,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            launch_error: Some(message.to_string()),
            ..Self::new(MockRenderer::new())
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl RendererFactory for MockRendererFactory {
    type Renderer = MockRenderer;

    async fn launch(&self) -> Result<MockRenderer, AppError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.launch_error {
            Some(message) => Err(AppError::BrowserError(message.clone())),
            None => Ok(self.renderer.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps the `Debug` rendering of every event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.contains(needle))
    }
}

impl CrawlReporter for RecordingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

// ---------------------------------------------------------------------------
// FlakyJobStore
// ---------------------------------------------------------------------------

/// In-memory job store whose first `failures` terminal writes error out.
#[derive(Clone)]
pub struct FlakyJobStore {
    inner: MemoryJobStore,
    failures: usize,
    finish_calls: Arc<AtomicUsize>,
}

impl FlakyJobStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            failures,
            finish_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }
}

impl JobStore for FlakyJobStore {
    async fn create_job(&self, target_url: &str) -> Result<CrawlJob, AppError> {
        self.inner.create_job(target_url).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<CrawlJob>, AppError> {
        self.inner.get_job(job_id).await
    }

    async fn finish_job(&self, job_id: Uuid, outcome: &CrawlOutcome) -> Result<bool, AppError> {
        let call = self.finish_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AppError::DatabaseError("connection closed".into()));
        }
        self.inner.finish_job(job_id, outcome).await
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<CrawlJob>, AppError> {
        self.inner.list_jobs(status, limit).await
    }

    async fn fail_orphaned_jobs(&self, error: &str) -> Result<u64, AppError> {
        self.inner.fail_orphaned_jobs(error).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A listing page with one tile per slug, linking to `/products/{slug}`.
pub fn listing_page(slugs: &[&str], with_price: bool) -> String {
    let price = if with_price { "<span>£4.99</span>" } else { "" };
    let tiles: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="tile"><img src="/img/{slug}.jpg" alt="{slug}"><a href="/products/{slug}">Book {slug}</a>{price}</li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{tiles}</ul></body></html>")
}

/// A product page titled `Book {slug}` with a one-line description.
pub fn detail_page(slug: &str) -> String {
    format!(
        r#"<html><head><title>{slug}</title></head><body><h1>Book {slug}</h1><div id="description">About {slug}.</div></body></html>"#
    )
}

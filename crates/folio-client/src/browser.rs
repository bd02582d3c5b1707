use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use folio_core::error::AppError;
use folio_core::request::{CrawlRequest, RequestRole};
use folio_core::traits::{PageRenderer, RenderedPage, RendererFactory};
use futures::StreamExt;
use tokio::time::Instant;
use url::Url;

use crate::BROWSER_USER_AGENT;

/// Extra time a listing page gets after `<body>` appears, for lazily loaded
/// product grids.
pub const LISTING_SETTLE: Duration = Duration::from_secs(5);

/// Headless-browser renderer using Chromium via the Chrome DevTools Protocol.
///
/// Unlike [`crate::HttpRenderer`], this executes scripts before returning the
/// DOM, so client-rendered catalogs and lazy-loaded grids come out populated.
///
/// A single Chromium process is shared across all clones of this struct;
/// each render opens a new tab, grabs the rendered HTML and closes the tab.
#[derive(Clone)]
pub struct BrowserRenderer {
    browser: Arc<Browser>,
    timeout: Duration,
    listing_settle: Duration,
}

impl BrowserRenderer {
    /// Launches headless Chromium with the given navigation timeout.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH`, `CHROME_BIN`
    /// or the default locations checked by `chromiumoxide`.
    pub async fn launch(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--no-first-run")
            .arg("--lang=en-US")
            .arg(format!("--user-agent={BROWSER_USER_AGENT}"))
            .build()
            .map_err(|e| AppError::BrowserError(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
            listing_settle: LISTING_SETTLE,
        })
    }

    pub fn with_listing_settle(mut self, settle: Duration) -> Self {
        self.listing_settle = settle;
        self
    }
}

/// Locate a real Chrome/Chromium binary.
///
/// The snap wrapper at `/snap/bin/chromium` strips unknown CLI flags and
/// breaks headless mode, so the binary inside the snap is preferred.
fn find_chrome_binary() -> Option<PathBuf> {
    const CANDIDATES: [&str; 6] = [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

impl BrowserRenderer {
    /// Wait for `<body>` (plus the listing settle time) and read the DOM.
    async fn read_page(&self, page: &Page, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        page.find_element("body")
            .await
            .map_err(|e| AppError::BrowserError(format!("page did not render body: {e}")))?;

        if request.role == RequestRole::Listing && !self.listing_settle.is_zero() {
            tokio::time::sleep(self.listing_settle).await;
        }

        let html = page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("failed to read page content: {e}")))?;
        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| request.url.clone());

        Ok(RenderedPage { url, html })
    }
}

impl PageRenderer for BrowserRenderer {
    async fn render(&self, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        let target = request.url.as_str();
        let deadline = Instant::now() + self.timeout;
        let timed_out = || AppError::Timeout(self.timeout.as_secs());

        let page = tokio::time::timeout_at(deadline, self.browser.new_page(target))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| AppError::BrowserError(format!("failed to navigate to {target}: {e}")))?;

        let result = tokio::time::timeout_at(deadline, self.read_page(&page, request))
            .await
            .unwrap_or_else(|_| Err(timed_out()));

        // The tab is closed on every path once it exists.
        if let Err(e) = page.close().await {
            tracing::debug!(url = target, error = %e, "Failed to close browser tab");
        }

        result
    }
}

/// Launches one Chromium per run.
#[derive(Debug, Clone)]
pub struct BrowserRendererFactory {
    timeout: Duration,
}

impl BrowserRendererFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RendererFactory for BrowserRendererFactory {
    type Renderer = BrowserRenderer;

    async fn launch(&self) -> Result<BrowserRenderer, AppError> {
        BrowserRenderer::launch(self.timeout).await
    }
}

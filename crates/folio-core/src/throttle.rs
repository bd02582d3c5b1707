//! Per-host request throttling for polite crawling.
//!
//! Wraps any [`PageRenderer`] with a minimum delay between two loads from
//! the same host. Concurrent requests to different hosts are not held back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::error::AppError;
use crate::request::CrawlRequest;
use crate::traits::{PageRenderer, RenderedPage};

/// A [`PageRenderer`] wrapper that enforces per-host spacing.
///
/// A zero delay turns the wrapper into a pass-through.
#[derive(Clone)]
pub struct ThrottledRenderer<R> {
    inner: R,
    delay: Duration,
    /// Next free slot per host key.
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<R: PageRenderer> ThrottledRenderer<R> {
    pub fn new(inner: R, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// scheme://host:port
    fn host_key(url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    /// Reserve the next slot for `host` and sleep until it arrives.
    ///
    /// Slots are handed out under the lock, so concurrent callers for one
    /// host queue up `delay` apart instead of all waking at once.
    async fn wait_for_host(&self, host: &str) {
        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(host).copied().filter(|s| *s > now).unwrap_or(now);
            slots.insert(host.to_string(), slot + self.delay);
            slot - now
        };

        if !wait.is_zero() {
            tracing::debug!(%host, sleep_ms = %wait.as_millis(), "Throttling request");
            tokio::time::sleep(wait).await;
        }
    }
}

impl<R: PageRenderer> PageRenderer for ThrottledRenderer<R> {
    async fn render(&self, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        if !self.delay.is_zero() {
            if let Some(host) = Self::host_key(&request.url) {
                self.wait_for_host(&host).await;
            }
        }
        self.inner.render(request).await
    }
}

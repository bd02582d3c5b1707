use std::net::IpAddr;
use std::time::Duration;

use folio_core::error::AppError;
use folio_core::request::CrawlRequest;
use folio_core::traits::{PageRenderer, RenderedPage, RendererFactory};
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use url::Url;

use crate::{BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT};

/// Plain HTTP renderer using reqwest.
///
/// Returns server-rendered HTML without executing scripts. Requests carry a
/// desktop browser User-Agent and `Accept-Language`, since catalog sites
/// commonly serve bots a stripped or localized page.
///
/// Targets resolving to loopback, private or link-local addresses are
/// refused unless [`allow_private_urls`](Self::allow_private_urls) is set.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
    timeout_secs: u64,
    ssrf_protection: bool,
}

impl HttpRenderer {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            ssrf_protection: true,
        })
    }

    /// Let crawls reach loopback and private networks (local CLI runs).
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(&self, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        if self.ssrf_protection {
            validate_url(&request.url).await?;
        }

        let response = self
            .client
            .get(request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: request.url.to_string(),
            });
        }

        let url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        tracing::debug!(%url, bytes = html.len(), "Page fetched");
        Ok(RenderedPage { url, html })
    }
}

/// Builds an [`HttpRenderer`] per run.
#[derive(Debug, Clone)]
pub struct HttpRendererFactory {
    timeout: Duration,
    ssrf_protection: bool,
}

impl HttpRendererFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ssrf_protection: true,
        }
    }

    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }
}

impl RendererFactory for HttpRendererFactory {
    type Renderer = HttpRenderer;

    async fn launch(&self) -> Result<HttpRenderer, AppError> {
        let renderer = HttpRenderer::with_timeout(self.timeout)?;
        Ok(if self.ssrf_protection {
            renderer
        } else {
            renderer.allow_private_urls()
        })
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Refuse crawl targets that are not http(s) or whose host resolves to an
/// internal address. Every resolved address must be public.
async fn validate_url(url: &Url) -> Result<(), AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;

    // IP literals need no lookup. IPv6 hosts come bracketed.
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        if is_private_ip(socket_addr.ip()) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP {}",
                socket_addr.ip()
            )));
        }
    }

    Ok(())
}

/// Addresses a public crawl must never reach.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254.0.0/16, cloud metadata
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

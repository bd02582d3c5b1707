//! Decides which links found on a listing page are enqueued as detail
//! requests.
//!
//! Discovery is limited to anchors whose `href` contains a product path,
//! on the seed's domain, and never to collection/category/static pages,
//! basket or checkout, even when such a URL also contains a product path.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::error::AppError;

const PRODUCT_PATH: &str = "/products/";

/// URL fragments that take the crawl outside the product graph.
pub const EXCLUDED_PATTERNS: [&str; 5] =
    ["/collections/", "/category/", "/pages/", "/basket", "/checkout"];

static PRODUCT_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href*=\"/products/\"]")
        .unwrap_or_else(|e| panic!("invalid product link selector: {e}"))
});

/// Link scope for one run, anchored at the seed URL.
#[derive(Debug, Clone)]
pub struct LinkScope {
    /// Seed host with any leading `www.` removed.
    base_domain: String,
}

impl LinkScope {
    pub fn for_seed(seed: &Url) -> Result<Self, AppError> {
        let host = seed
            .host_str()
            .ok_or_else(|| AppError::ValidationError(format!("URL has no host: {seed}")))?;
        Ok(Self {
            base_domain: strip_www(&host.to_ascii_lowercase()).to_string(),
        })
    }

    /// True for the seed's domain and any of its subdomains.
    pub fn is_same_domain(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host = strip_www(&host);
        host == self.base_domain || host.ends_with(&format!(".{}", self.base_domain))
    }

    pub fn is_excluded(url: &Url) -> bool {
        let url = url.as_str();
        EXCLUDED_PATTERNS.iter().any(|p| url.contains(p))
    }

    /// Whether a resolved link may be enqueued as a detail request.
    pub fn admits(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url.path().contains(PRODUCT_PATH)
            && self.is_same_domain(url)
            && !Self::is_excluded(url)
    }

    /// Collect admissible product links from a listing page, in document
    /// order and without duplicates.
    pub fn discover(&self, html: &str, page_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();

        document
            .select(&PRODUCT_LINKS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| page_url.join(href.trim()).ok())
            .map(|mut url| {
                url.set_fragment(None);
                url
            })
            .filter(|url| self.admits(url))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect()
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

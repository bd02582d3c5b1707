//! Heuristic extraction of catalog records from rendered pages.
//!
//! Everything here is a pure function from page HTML to owned results: no
//! I/O, no shared state. Parsed documents never outlive the call, so callers
//! can hold the results across `.await` points.

pub mod detail;
pub mod listing;

pub use detail::{DESCRIPTION_MAX_CHARS, DetailExtraction, extract_detail};
pub use listing::{ListingCandidate, ListingExtraction, ListingStats, extract_listing};

use scraper::{ElementRef, Selector};
use url::Url;

/// Compile a selector known at build time.
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

/// Visible text of an element with runs of whitespace collapsed.
fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve an attribute value against the page URL, keeping only http(s).
fn resolve_link(page_url: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = page_url.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use super::{element_text, resolve_link, selector};
use crate::models::{PRICE_PLACEHOLDER, ProductDraft};

/// Containers shorter than this are decoration, not product tiles.
const MIN_CONTAINER_TEXT: usize = 5;

const CURRENCY_MARKERS: [char; 3] = ['£', '$', '€'];

/// Link targets that are never products.
const NON_PRODUCT_MARKERS: [&str; 4] = ["login", "account", "cart", "search"];

static CONTAINERS: LazyLock<Selector> = LazyLock::new(|| selector("div, li, article"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$£€]\s?\d{1,3}(?:,\d{3})*\.\d{2}|[$£€]\s?\d+\.\d{2}")
        .unwrap_or_else(|e| panic!("invalid price pattern: {e}"))
});

/// A product tile found on a listing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingCandidate {
    pub title: String,
    pub price: String,
    pub product_url: String,
    pub image_url: Option<String>,
}

impl ListingCandidate {
    pub fn into_draft(self, category: &str) -> ProductDraft {
        ProductDraft::new(self.title, self.product_url, category)
            .with_price(self.price)
            .with_image_url(self.image_url)
    }
}

/// Raw counts kept so an empty result can be explained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListingStats {
    pub containers_scanned: usize,
    pub skipped_no_price: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingExtraction {
    pub candidates: Vec<ListingCandidate>,
    pub stats: ListingStats,
}

/// Harvest product candidates from a listing page.
///
/// Any `div`, `li` or `article` holding an image, a link and a little text
/// is considered a tile. Tiles without a currency marker are rejected and
/// counted in [`ListingStats::skipped_no_price`]. Results are deduplicated by
/// title (first wins), then by product URL.
pub fn extract_listing(html: &str, page_url: &Url) -> ListingExtraction {
    let document = Html::parse_document(html);
    let mut stats = ListingStats::default();
    let mut seen_titles = HashSet::new();
    let mut by_title = Vec::new();

    for container in document.select(&CONTAINERS) {
        stats.containers_scanned += 1;

        let (Some(img), Some(link)) = (
            container.select(&IMAGE).next(),
            container.select(&LINK).next(),
        ) else {
            continue;
        };
        let text = element_text(&container);
        if text.chars().count() <= MIN_CONTAINER_TEXT {
            continue;
        }

        if !text.contains(CURRENCY_MARKERS) {
            stats.skipped_no_price += 1;
            continue;
        }

        let Some(mut url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(page_url, href))
        else {
            continue;
        };
        // Same key the detail path upserts under.
        url.set_fragment(None);
        if !is_product_candidate_url(url.as_str()) {
            continue;
        }

        let title = Some(element_text(&link))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                img.value()
                    .attr("alt")
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unknown Title".to_string());

        if !seen_titles.insert(title.clone()) {
            continue;
        }

        let price = PRICE
            .find(&text)
            .map(|m| m.as_str().replace(char::is_whitespace, ""))
            .unwrap_or_else(|| PRICE_PLACEHOLDER.to_string());

        let image_url = img
            .value()
            .attr("src")
            .filter(|src| !src.trim().is_empty())
            .or_else(|| img.value().attr("data-src"))
            .and_then(|src| resolve_link(page_url, src))
            .map(String::from);

        by_title.push(ListingCandidate {
            title,
            price,
            product_url: url.into(),
            image_url,
        });
    }

    let mut seen_urls = HashSet::new();
    let candidates = by_title
        .into_iter()
        .filter(|c| seen_urls.insert(c.product_url.clone()))
        .collect();

    ListingExtraction { candidates, stats }
}

/// Reject account/cart/search targets and collection-style navigation that
/// is not also a product path.
fn is_product_candidate_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if NON_PRODUCT_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    let is_product_path = lower.contains("/products/");
    if (lower.contains("/collections/") || lower.contains("/category/")) && !is_product_path {
        return false;
    }
    true
}

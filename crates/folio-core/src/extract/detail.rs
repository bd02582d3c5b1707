use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{collapse_whitespace, element_text, selector};
use crate::models::ProductDetailDraft;

/// Longest description kept, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Description strategies, tried in order until one yields text.
static DESCRIPTION: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "#description",
        ".description-container",
        ".product-description",
        "[itemprop=\"description\"]",
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static SPEC_ROWS: LazyLock<Selector> =
    LazyLock::new(|| selector(".product-details-table tr, .spec-row, tr"));
static SPEC_KEY: LazyLock<Selector> = LazyLock::new(|| selector("th, .label, td:first-child"));
static SPEC_VALUE: LazyLock<Selector> = LazyLock::new(|| selector("td, .value, td:last-child"));

static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static RATING: LazyLock<Selector> = LazyLock::new(|| selector("[itemprop=\"ratingValue\"]"));
static REVIEW_COUNT: LazyLock<Selector> = LazyLock::new(|| selector("[itemprop=\"reviewCount\"]"));

#[derive(Debug, Clone, PartialEq)]
pub struct DetailExtraction {
    pub title: String,
    pub detail: ProductDetailDraft,
}

/// Extract title, description, specification table and rating from a
/// product page. Missing pieces degrade to empty values, never errors.
pub fn extract_detail(html: &str) -> DetailExtraction {
    let document = Html::parse_document(html);

    let title = first_text(&document, &HEADING)
        .or_else(|| first_text(&document, &TITLE))
        .unwrap_or_else(|| "Unknown Title".to_string());

    let description = DESCRIPTION
        .iter()
        .find_map(|s| first_text(&document, s))
        .map(|text| truncate_chars(&text, DESCRIPTION_MAX_CHARS))
        .unwrap_or_default();

    DetailExtraction {
        title,
        detail: ProductDetailDraft {
            description,
            specs: extract_specs(&document),
            ratings_avg: microdata(&document, &RATING).and_then(|v| v.parse::<f64>().ok()),
            reviews_count: microdata(&document, &REVIEW_COUNT).and_then(|v| {
                v.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse::<u32>()
                    .ok()
            }),
        },
    }
}

fn extract_specs(document: &Html) -> BTreeMap<String, String> {
    let mut specs = BTreeMap::new();
    for row in document.select(&SPEC_ROWS) {
        let key = row.select(&SPEC_KEY).next().map(|e| element_text(&e));
        let value = row.select(&SPEC_VALUE).last().map(|e| element_text(&e));
        let (Some(key), Some(value)) = (key, value) else {
            continue;
        };
        // Single-cell rows select the same cell twice.
        if key.is_empty() || value.is_empty() || key == value {
            continue;
        }
        let key = key.trim_end_matches(':').trim().to_string();
        if !key.is_empty() {
            specs.insert(key, value);
        }
    }
    specs
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|e| element_text(&e))
        .find(|text| !text.is_empty())
}

/// Microdata value from a `content` attribute, falling back to element text.
fn microdata(document: &Html, selector: &Selector) -> Option<String> {
    let element: ElementRef<'_> = document.select(selector).next()?;
    element
        .value()
        .attr("content")
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
        .or_else(|| Some(element_text(&element)).filter(|v| !v.is_empty()))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

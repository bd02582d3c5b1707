use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price stored when a listing tile carries no machine-readable amount,
/// and for products first seen on a detail page.
pub const PRICE_PLACEHOLDER: &str = "Check Price";

/// Category stamped on every record a run produces.
pub const DEFAULT_CATEGORY: &str = "Books";

/// Upsert request for a catalog entry, keyed by `product_url`.
///
/// `None` fields leave whatever the store already holds untouched, so a
/// detail-page pass never clobbers the price harvested from a listing tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub product_url: String,
    pub category: String,
    pub price: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub condition: Option<String>,
    pub description: Option<String>,
}

impl ProductDraft {
    pub fn new(
        title: impl Into<String>,
        product_url: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            product_url: product_url.into(),
            category: category.into(),
            price: None,
            author: None,
            image_url: None,
            condition: None,
            description: None,
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// A stored catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    /// Opaque display string, currency-prefixed (e.g. "£4.99").
    pub price: String,
    pub image_url: Option<String>,
    pub product_url: String,
    pub category: String,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Extended product data harvested from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetailDraft {
    pub description: String,
    /// Key/value facts such as ISBN, publisher or year.
    pub specs: BTreeMap<String, String>,
    /// Best effort: `None` when the page exposes no parseable rating widget.
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<u32>,
}

/// A stored detail record, at most one per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetailRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub description: String,
    pub specs: BTreeMap<String, String>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

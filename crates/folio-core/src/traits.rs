use std::future::Future;

use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ProductDetailDraft, ProductDetailRecord, ProductDraft, ProductRecord};
use crate::request::CrawlRequest;

/// A page after loading (and, for browser engines, rendering).
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub html: String,
}

/// Loads a crawl request and returns its DOM as HTML.
pub trait PageRenderer: Send + Sync + Clone {
    fn render(
        &self,
        request: &CrawlRequest,
    ) -> impl Future<Output = Result<RenderedPage, AppError>> + Send;
}

/// Starts a rendering engine for one run.
///
/// Failing to launch is the one error that fails a run outright.
pub trait RendererFactory: Send + Sync + Clone {
    type Renderer: PageRenderer + 'static;

    fn launch(&self) -> impl Future<Output = Result<Self::Renderer, AppError>> + Send;
}

/// Idempotent ingestion into the catalog record store.
///
/// Both upserts must be safe to call concurrently for the same key: two
/// writers racing on one product URL end with one record, last write wins
/// on non-key fields.
pub trait CatalogStore: Send + Sync + Clone {
    /// Insert or merge a product keyed by its canonical URL and stamp
    /// `scraped_at`. `None` fields in the draft keep stored values.
    fn upsert_product(
        &self,
        draft: &ProductDraft,
    ) -> impl Future<Output = Result<ProductRecord, AppError>> + Send;

    /// Insert or replace the single detail record of a product.
    fn upsert_detail(
        &self,
        product_id: Uuid,
        detail: &ProductDetailDraft,
    ) -> impl Future<Output = Result<ProductDetailRecord, AppError>> + Send;

    fn get_product_by_url(
        &self,
        product_url: &str,
    ) -> impl Future<Output = Result<Option<ProductRecord>, AppError>> + Send;

    fn get_detail(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = Result<Option<ProductDetailRecord>, AppError>> + Send;
}

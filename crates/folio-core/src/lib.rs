pub mod config;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod job;
pub mod job_store;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod reporter;
pub mod request;
pub mod runner;
pub mod scope;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::CrawlConfig;
pub use error::AppError;
pub use job::{CrawlJob, CrawlOutcome, JobStatus};
pub use job_store::JobStore;
pub use lifecycle::{JobManager, validate_target_url};
pub use memory::{MemoryCatalogStore, MemoryJobStore};
pub use models::{ProductDetailDraft, ProductDetailRecord, ProductDraft, ProductRecord};
pub use reporter::{CrawlEvent, CrawlReporter, TracingCrawlReporter};
pub use request::{CrawlRequest, RequestRole};
pub use runner::{CrawlRunner, CrawlSummary};
pub use scope::LinkScope;
pub use traits::{CatalogStore, PageRenderer, RenderedPage, RendererFactory};

use std::time::Duration;

use folio_core::error::AppError;
use folio_core::request::CrawlRequest;
use folio_core::traits::{PageRenderer, RenderedPage, RendererFactory};

#[cfg(feature = "browser")]
use crate::browser::{BrowserRenderer, BrowserRendererFactory};
use crate::http::{HttpRenderer, HttpRendererFactory};

/// Rendering engine chosen at startup.
#[derive(Debug, Clone)]
pub enum Engine {
    Http(HttpRendererFactory),
    #[cfg(feature = "browser")]
    Browser(BrowserRendererFactory),
}

impl Engine {
    /// Build the engine named by `FOLIO_RENDERER` (`http` or `browser`,
    /// default `http`).
    pub fn from_env(timeout: Duration) -> Result<Self, AppError> {
        let name = std::env::var("FOLIO_RENDERER").unwrap_or_else(|_| "http".to_string());
        Self::named(&name, timeout)
    }

    pub fn named(name: &str, timeout: Duration) -> Result<Self, AppError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "http" => Ok(Self::http(timeout)),
            "browser" => Self::browser(timeout),
            other => Err(AppError::ConfigError(format!(
                "FOLIO_RENDERER must be 'http' or 'browser', got '{other}'"
            ))),
        }
    }

    pub fn http(timeout: Duration) -> Self {
        Self::Http(HttpRendererFactory::new(timeout))
    }

    #[cfg(feature = "browser")]
    pub fn browser(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self::Browser(BrowserRendererFactory::new(timeout)))
    }

    #[cfg(not(feature = "browser"))]
    pub fn browser(_timeout: Duration) -> Result<Self, AppError> {
        Err(AppError::ConfigError(
            "browser rendering requires the 'browser' feature".into(),
        ))
    }

    /// Allow targets on private networks (local catalogs, CLI use).
    pub fn allow_private_urls(self) -> Self {
        match self {
            Self::Http(factory) => Self::Http(factory.allow_private_urls()),
            #[cfg(feature = "browser")]
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            #[cfg(feature = "browser")]
            Self::Browser(_) => "browser",
        }
    }
}

/// A launched engine.
#[derive(Clone)]
pub enum EngineRenderer {
    Http(HttpRenderer),
    #[cfg(feature = "browser")]
    Browser(BrowserRenderer),
}

impl PageRenderer for EngineRenderer {
    async fn render(&self, request: &CrawlRequest) -> Result<RenderedPage, AppError> {
        match self {
            Self::Http(renderer) => renderer.render(request).await,
            #[cfg(feature = "browser")]
            Self::Browser(renderer) => renderer.render(request).await,
        }
    }
}

impl RendererFactory for Engine {
    type Renderer = EngineRenderer;

    async fn launch(&self) -> Result<EngineRenderer, AppError> {
        tracing::debug!(engine = self.name(), "Launching renderer");
        match self {
            Self::Http(factory) => Ok(EngineRenderer::Http(factory.launch().await?)),
            #[cfg(feature = "browser")]
            Self::Browser(factory) => Ok(EngineRenderer::Browser(factory.launch().await?)),
        }
    }
}

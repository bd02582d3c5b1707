#[cfg(feature = "browser")]
pub mod browser;
pub mod engine;
pub mod http;

#[cfg(feature = "browser")]
pub use browser::{BrowserRenderer, BrowserRendererFactory};
pub use engine::{Engine, EngineRenderer};
pub use http::{HttpRenderer, HttpRendererFactory};

/// Desktop Chrome User-Agent sent by every engine.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

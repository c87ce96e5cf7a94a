//! Document backends for the discovery and extraction tiers.
//!
//! Each backend turns a URL into an HTML snapshot that the shared,
//! selector-driven extraction code then parses:
//!
//! | Backend | Module | Tier | Notes |
//! |---------|--------|------|-------|
//! | Scripted browser | [`rendered`] | 1 | Live DOM after network settle + fixed delay |
//! | Plain HTTP | [`static_http`] | 2/3 | Pre-hydration markup, no scripts |
//!
//! Both backends race every suspend point against a caller-supplied
//! [`CancellationToken`] and report cancellation as [`Error::Cancelled`].
//!
//! Parsed documents (`scraper::Html`) are not `Send`, so backends hand back
//! the raw markup and callers parse it inside synchronous extraction
//! functions that never hold a document across an `.await`.

pub mod rendered;
pub mod static_http;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::Tier;

pub use rendered::{BrowserLauncher, BrowserSession, ChromiumLauncher, RenderedFetcher};
pub use static_http::StaticFetcher;

/// Something that can produce the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Tier this backend represents, for tagging results and log events.
    fn tier(&self) -> Tier;

    /// Fetch the markup at `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::RenderFetch`] or [`Error::StaticFetch`] when the backend fails
    /// - [`Error::Cancelled`] when `cancel` fires first
    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<String, Error>;
}

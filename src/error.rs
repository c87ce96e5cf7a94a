//! Error taxonomy for the discovery and extraction pipeline.
//!
//! Discovery-path errors ([`Error::RenderFetch`], [`Error::StaticFetch`],
//! [`Error::EmptyResult`]) are absorbed by the cascade and turned into tier
//! escalation. [`Error::ContentExtraction`] and [`Error::Cancelled`] are the
//! only variants a caller is expected to handle.

use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::Tier;

/// Errors produced by fetchers, strategies and the extractor.
#[derive(Debug, Error)]
pub enum Error {
    /// Browser launch, navigation or DOM snapshot failed.
    #[error("rendered fetch of {url} failed: {source}")]
    RenderFetch {
        url: Url,
        #[source]
        source: BrowserError,
    },

    /// The HTTP request failed, returned a non-success status, or the body
    /// could not be read.
    #[error("static fetch of {url} failed: {reason}")]
    StaticFetch { url: Url, reason: String },

    /// The tier ran without error but matched nothing.
    #[error("{tier} tier matched no articles")]
    EmptyResult { tier: Tier },

    /// No tier produced a non-empty article body.
    #[error("could not extract content from {url}: {reason}")]
    ContentExtraction { url: Url, reason: String },

    /// The caller's cancellation token fired.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// A selector in the configuration does not parse.
    #[error("invalid selector `{query}`: {reason}")]
    Selector { query: String, reason: String },

    /// The configuration file could not be read or decoded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the cascade must stop instead of escalating to the next tier.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Caller-initiated cancellation or deadline expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled by caller")]
pub struct Cancelled;

/// Failures of a scripted browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to read page content: {0}")]
    Snapshot(String),
}

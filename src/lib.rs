//! # Zenn Scout
//!
//! Tiered, resilient discovery and extraction of technical articles from a
//! content platform whose markup drifts and whose pages may need client-side
//! rendering.
//!
//! ## Pipeline
//!
//! 1. **Discovery**: a keyword goes through the [`DiscoveryCascade`]
//!    (rendered search page, static search page, generic listing page) and
//!    always comes back as a [`DiscoveryResult`], real or placeholder
//! 2. **Extraction**: an article URL goes through the [`ArticleExtractor`]
//!    (rendered page, then static page) and yields an [`ArticleContent`]
//! 3. **Analysis**: [`classifier::classify`] detects the tech stack and the
//!    optional [`summarizer`] writes a prose report
//! 4. **Output**: [`outputs`] renders JSON and Markdown reports
//!
//! Every selector the pipeline uses is configuration
//! ([`config::ScraperConfig`]), evaluated through ordered rule lists
//! ([`selectors::RuleList`]).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod selectors;
pub mod summarizer;
pub mod utils;

pub use discovery::DiscoveryCascade;
pub use error::{BrowserError, Cancelled, Error};
pub use extractor::ArticleExtractor;
pub use models::{ArticleContent, ArticleSummary, DiscoveryKind, DiscoveryRequest, DiscoveryResult, Tier};

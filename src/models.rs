//! Data models for discovery requests, discovered articles and extracted content.
//!
//! This module defines the records that flow through the pipeline:
//! - [`DiscoveryRequest`]: a keyword search with a result bound
//! - [`ArticleSummary`]: one discovered article, as seen on a results or listing page
//! - [`DiscoveryResult`]: the terminal output of the discovery cascade
//! - [`ArticleContent`]: the structured content of a single article
//!
//! Serialized field names are camelCase so reports and summarizer payloads
//! keep the shape downstream consumers already expect (`publishedAt`,
//! `totalFound`, `tierUsed`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use url::Url;

use crate::utils::truncate_chars;

/// Maximum length of [`ArticleSummary`] excerpts, in characters.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// Default number of articles a discovery request asks for.
pub const DEFAULT_LIMIT: NonZeroUsize = NonZeroUsize::new(3).unwrap();

/// Which strategy produced a [`DiscoveryResult`] or an [`ArticleContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Scripted browser session over the search page.
    Rendered,
    /// Plain HTTP GET of the search page.
    Static,
    /// Generic listing page with local relevance filtering.
    Fallback,
    /// No tier produced results; the answer is a synthetic placeholder.
    None,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Rendered => "rendered",
            Tier::Static => "static",
            Tier::Fallback => "fallback",
            Tier::None => "none",
        };
        f.write_str(name)
    }
}

/// Content type a discovery request targets.
///
/// Accepted for forward compatibility; every tier currently searches articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryKind {
    #[default]
    Articles,
    Books,
}

impl fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryKind::Articles => f.write_str("articles"),
            DiscoveryKind::Books => f.write_str("books"),
        }
    }
}

impl FromStr for DiscoveryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "articles" => Ok(DiscoveryKind::Articles),
            "books" => Ok(DiscoveryKind::Books),
            other => Err(format!("unknown kind `{other}` (expected `articles` or `books`)")),
        }
    }
}

/// A keyword search bounded by `limit`.
///
/// `limit` bounds the number of returned articles at every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub keyword: String,
    pub limit: NonZeroUsize,
    #[serde(default)]
    pub kind: DiscoveryKind,
}

impl DiscoveryRequest {
    /// Create a request for `keyword` with the default limit and kind.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            limit: DEFAULT_LIMIT,
            kind: DiscoveryKind::default(),
        }
    }

    pub fn with_limit(mut self, limit: NonZeroUsize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_kind(mut self, kind: DiscoveryKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A discovered article as seen on a search-results or listing page.
///
/// The URL is always absolute, joined against the platform origin. The
/// excerpt is truncated to [`EXCERPT_MAX_CHARS`] characters on construction
/// and on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub title: String,
    pub url: Url,
    pub author: String,
    #[serde(deserialize_with = "bounded_excerpt")]
    excerpt: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Tags in document order. Duplicates are kept as encountered.
    pub tags: Vec<String>,
}

impl ArticleSummary {
    pub fn new(
        title: impl Into<String>,
        url: Url,
        author: impl Into<String>,
        excerpt: &str,
    ) -> Self {
        Self {
            title: title.into(),
            url,
            author: author.into(),
            excerpt: truncate_chars(excerpt.trim(), EXCERPT_MAX_CHARS),
            published_at: None,
            tags: Vec::new(),
        }
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// The excerpt, at most [`EXCERPT_MAX_CHARS`] characters long.
    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }
}

fn bounded_excerpt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(truncate_chars(raw.trim(), EXCERPT_MAX_CHARS))
}

/// Terminal output of the discovery cascade.
///
/// `articles.len()` never exceeds the request limit. When no tier found
/// anything, `articles` holds exactly one synthetic placeholder,
/// `total_found` is 0 and `tier_used` is [`Tier::None`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub keyword: String,
    pub articles: Vec<ArticleSummary>,
    pub total_found: usize,
    pub tier_used: Tier,
}

impl DiscoveryResult {
    /// Build a result from real articles found by `tier`.
    pub fn found(keyword: impl Into<String>, articles: Vec<ArticleSummary>, tier: Tier) -> Self {
        Self {
            keyword: keyword.into(),
            total_found: articles.len(),
            articles,
            tier_used: tier,
        }
    }

    /// Whether this result is a synthetic "nothing found" answer.
    pub fn is_placeholder(&self) -> bool {
        self.tier_used == Tier::None
    }
}

/// Structured content of a single article.
///
/// `body` is never empty: an empty body is reported as
/// [`crate::Error::ContentExtraction`] instead of a value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub title: String,
    pub body: String,
    pub url: Url,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_url() -> Url {
        Url::parse("https://zenn.dev/alice/articles/rust-intro").unwrap()
    }

    #[test]
    fn test_excerpt_is_bounded_for_any_length() {
        for len in [0, 1, 199, 200, 201, 1_000, 10_000] {
            let long = "あ".repeat(len);
            let summary = ArticleSummary::new("t", article_url(), "a", &long);
            assert!(summary.excerpt().chars().count() <= EXCERPT_MAX_CHARS);
            assert_eq!(summary.excerpt().chars().count(), len.min(EXCERPT_MAX_CHARS));
        }
    }

    #[test]
    fn test_deserialized_excerpt_is_bounded() {
        let json = serde_json::json!({
            "title": "Rust入門",
            "url": "https://zenn.dev/alice/articles/rust-intro",
            "author": "alice",
            "excerpt": "い".repeat(500),
            "publishedAt": null,
            "tags": [],
        });
        let summary: ArticleSummary = serde_json::from_value(json).unwrap();
        assert_eq!(summary.excerpt().chars().count(), EXCERPT_MAX_CHARS);
    }

    #[test]
    fn test_request_defaults() {
        let request = DiscoveryRequest::new("hooks");
        assert_eq!(request.limit.get(), 3);
        assert_eq!(request.kind, DiscoveryKind::Articles);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Books".parse::<DiscoveryKind>(), Ok(DiscoveryKind::Books));
        assert_eq!("articles".parse::<DiscoveryKind>(), Ok(DiscoveryKind::Articles));
        assert!("videos".parse::<DiscoveryKind>().is_err());
    }

    #[test]
    fn test_discovery_result_serialization() {
        let summary = ArticleSummary::new("Rust入門", article_url(), "alice", "intro")
            .with_tags(vec!["rust".to_string(), "rust".to_string()]);
        let result = DiscoveryResult::found("rust", vec![summary], Tier::Static);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalFound"], 1);
        assert_eq!(json["tierUsed"], "static");
        assert_eq!(json["articles"][0]["excerpt"], "intro");
        assert_eq!(json["articles"][0]["tags"].as_array().unwrap().len(), 2);
        assert!(!result.is_placeholder());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Rendered.to_string(), "rendered");
        assert_eq!(Tier::None.to_string(), "none");
    }
}

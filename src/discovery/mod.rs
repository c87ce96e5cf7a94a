//! Keyword discovery strategies and the cascade that orchestrates them.
//!
//! Every tier implements [`DiscoveryStrategy`]. Tiers 1 and 2 share one
//! implementation, [`SearchPageStrategy`], over different [`PageSource`]
//! backends: both load the platform's search page and run the same
//! selector-driven extraction ([`extract_summaries`]) over the resulting
//! markup. Tier 3 is [`fallback::FallbackListingStrategy`].
//!
//! The [`cascade::DiscoveryCascade`] tries strategies strictly in order and
//! turns every discovery-path failure into escalation.

pub mod cascade;
pub mod fallback;

use async_trait::async_trait;
use itertools::Itertools;
use scraper::{ElementRef, Html};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::{SearchSelectors, SiteConfig};
use crate::error::Error;
use crate::fetch::PageSource;
use crate::models::{ArticleSummary, DiscoveryRequest, DiscoveryResult, Tier};
use crate::selectors::{RuleList, element_text};
use crate::utils::parse_timestamp;

pub use cascade::DiscoveryCascade;
pub use fallback::FallbackListingStrategy;

/// One tier of keyword discovery.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn tier(&self) -> Tier;

    /// Run this tier once for `request`.
    ///
    /// # Errors
    ///
    /// Tiers report failure through any [`Error`] variant; the cascade
    /// escalates on everything except [`Error::Cancelled`]. Tiers that can
    /// be escalated past report "nothing matched" as [`Error::EmptyResult`].
    async fn attempt(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, Error>;
}

/// Compiled rules for pulling [`ArticleSummary`] records out of a search page.
#[derive(Debug, Clone)]
pub struct SummaryRules {
    pub links: RuleList,
    pub title: RuleList,
    pub container: RuleList,
    pub author: RuleList,
    pub excerpt: RuleList,
    pub tags: RuleList,
    pub published_at: RuleList,
}

impl SummaryRules {
    pub fn compile(selectors: &SearchSelectors) -> Result<Self, Error> {
        Ok(Self {
            links: RuleList::compile(&selectors.links)?,
            title: RuleList::compile(&selectors.title)?,
            container: RuleList::compile(&selectors.container)?,
            author: RuleList::compile(&selectors.author)?,
            excerpt: RuleList::compile(&selectors.excerpt)?,
            tags: RuleList::compile(&selectors.tags)?,
            published_at: RuleList::compile(&selectors.published_at)?,
        })
    }
}

/// Extract up to `limit` article summaries from search-page markup.
///
/// Link nodes come from the first link rule that matches anything. Nodes
/// whose `href` lacks the article-path marker or whose title is empty are
/// skipped, and articles linked more than once keep only their first link.
///
/// Per node:
/// - title: nested heading, else the node's own text
/// - author, excerpt: closest result container's match, else the node's own
/// - tags: every tag-like element of the container (or node), duplicates kept
/// - published_at: container's `datetime` attribute, when it parses
pub fn extract_summaries(
    html: &str,
    site: &SiteConfig,
    rules: &SummaryRules,
    limit: usize,
) -> Vec<ArticleSummary> {
    let document = Html::parse_document(html);
    let Some((winner, nodes)) = rules.links.resolve_with_rule(document.root_element()) else {
        debug!("No link rule matched");
        return Vec::new();
    };
    debug!(rule = winner.query(), count = nodes.len(), "Link rule matched");

    nodes
        .into_iter()
        .filter_map(|node| summarize_node(node, site, rules))
        .unique_by(|summary| summary.url.clone())
        .take(limit)
        .collect()
}

fn summarize_node(node: ElementRef<'_>, site: &SiteConfig, rules: &SummaryRules) -> Option<ArticleSummary> {
    let href = node.value().attr("href")?;
    if !site.is_article_href(href) {
        return None;
    }
    let url = site.absolutize(href)?;

    let title = rules
        .title
        .resolve_field(node)
        .unwrap_or_else(|| element_text(node));
    if title.is_empty() {
        return None;
    }

    let container = rules.container.closest(node);
    let field = |list: &RuleList| {
        container
            .and_then(|c| list.resolve_field(c))
            .or_else(|| list.resolve_field(node))
    };

    let author = field(&rules.author).unwrap_or_default();
    let excerpt = field(&rules.excerpt).unwrap_or_default();
    let published_at = field(&rules.published_at).and_then(|raw| parse_timestamp(&raw));

    let tags = rules
        .tags
        .resolve(container.unwrap_or(node))
        .into_iter()
        .map(element_text)
        .filter(|tag| !tag.is_empty())
        .collect();

    Some(
        ArticleSummary::new(title, url, author, &excerpt)
            .with_published_at(published_at)
            .with_tags(tags),
    )
}

/// Tiers 1 and 2: the platform search page, loaded through `source`.
pub struct SearchPageStrategy<S> {
    source: S,
    site: SiteConfig,
    rules: SummaryRules,
}

impl<S: PageSource> SearchPageStrategy<S> {
    pub fn new(source: S, site: SiteConfig, rules: SummaryRules) -> Self {
        Self { source, site, rules }
    }
}

#[async_trait]
impl<S: PageSource> DiscoveryStrategy for SearchPageStrategy<S> {
    fn tier(&self) -> Tier {
        self.source.tier()
    }

    #[instrument(level = "info", skip_all, fields(keyword = %request.keyword, tier = %self.tier()))]
    async fn attempt(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, Error> {
        let url = self.site.search_url(&request.keyword)?;
        let html = self.source.fetch(&url, cancel).await?;

        let articles = extract_summaries(&html, &self.site, &self.rules, request.limit.get());
        if articles.is_empty() {
            return Err(Error::EmptyResult { tier: self.tier() });
        }
        Ok(DiscoveryResult::found(request.keyword.clone(), articles, self.tier()))
    }
}

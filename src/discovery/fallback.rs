//! Tier 3: the generic listing page with a local relevance filter.
//!
//! No search endpoint is involved here, so relevance is decided locally:
//! a candidate survives when its lower-cased title contains the whole
//! lower-cased keyword or any whitespace-delimited token of it. When nothing
//! survives, the tier answers with a synthetic placeholder instead of an
//! empty list.

use async_trait::async_trait;
use itertools::Itertools;
use scraper::{ElementRef, Html};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::DiscoveryStrategy;
use crate::config::{ListingSelectors, SiteConfig};
use crate::error::Error;
use crate::fetch::PageSource;
use crate::models::{ArticleSummary, DiscoveryResult, DiscoveryRequest, Tier};
use crate::selectors::{RuleList, element_text};

/// Author sentinel carried by synthetic placeholders.
pub const SYSTEM_AUTHOR: &str = "System";

/// Author used when a listing card names nobody.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Compiled rules for the listing page.
#[derive(Debug, Clone)]
pub struct ListingRules {
    pub links: RuleList,
    pub title: RuleList,
    pub title_container: RuleList,
    pub detail_container: RuleList,
    pub author: RuleList,
    pub excerpt: RuleList,
    pub min_title_chars: usize,
}

impl ListingRules {
    pub fn compile(selectors: &ListingSelectors) -> Result<Self, Error> {
        Ok(Self {
            links: RuleList::compile(&selectors.links)?,
            title: RuleList::compile(&selectors.title)?,
            title_container: RuleList::compile(&selectors.title_container)?,
            detail_container: RuleList::compile(&selectors.detail_container)?,
            author: RuleList::compile(&selectors.author)?,
            excerpt: RuleList::compile(&selectors.excerpt)?,
            min_title_chars: selectors.min_title_chars,
        })
    }
}

/// Whether `title` is relevant to `keyword`.
///
/// Case-insensitive. Matches the full keyword as a substring, or any of its
/// whitespace-delimited tokens. A blank keyword accepts every title.
pub fn is_relevant(title: &str, keyword: &str) -> bool {
    let title = title.to_lowercase();
    let keyword = keyword.trim().to_lowercase();
    title.contains(&keyword) || keyword.split_whitespace().any(|token| title.contains(token))
}

/// Collect up to `limit` relevant candidates from listing markup.
///
/// Link rules are tried in order. A rule whose matches yield no accepted
/// candidate hands over to the next one.
pub fn extract_listing(
    html: &str,
    site: &SiteConfig,
    rules: &ListingRules,
    keyword: &str,
    limit: usize,
) -> Vec<ArticleSummary> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    for rule in rules.links.iter() {
        let links = rule.matches(root);
        debug!(rule = rule.query(), count = links.len(), "Listing links matched");

        let accepted: Vec<ArticleSummary> = links
            .into_iter()
            .filter_map(|link| candidate(link, site, rules, keyword))
            .unique_by(|summary| summary.url.clone())
            .take(limit)
            .collect();

        if !accepted.is_empty() {
            return accepted;
        }
    }
    Vec::new()
}

fn candidate(
    link: ElementRef<'_>,
    site: &SiteConfig,
    rules: &ListingRules,
    keyword: &str,
) -> Option<ArticleSummary> {
    let href = link.value().attr("href")?;
    if !site.is_article_href(href) {
        return None;
    }

    let title = derive_title(link, rules)?;
    if title.chars().count() < rules.min_title_chars || !is_relevant(&title, keyword) {
        return None;
    }
    let url = site.absolutize(href)?;

    let details = rules.detail_container.closest(link);
    let author = details
        .and_then(|d| rules.author.resolve_field(d))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let excerpt = details
        .and_then(|d| rules.excerpt.resolve_field(d))
        .unwrap_or_default();

    Some(ArticleSummary::new(title, url, author, &excerpt))
}

/// Link text, else a nested heading, else the nearest container's heading.
fn derive_title(link: ElementRef<'_>, rules: &ListingRules) -> Option<String> {
    let own = element_text(link);
    if !own.is_empty() {
        return Some(own);
    }
    rules.title.resolve_field(link).or_else(|| {
        rules
            .title_container
            .closest(link)
            .and_then(|container| rules.title.resolve_field(container))
    })
}

/// Placeholder for a listing that loaded but held nothing relevant.
pub fn no_results(keyword: &str, site: &SiteConfig) -> DiscoveryResult {
    placeholder(
        keyword,
        format!("no results for «{keyword}»"),
        "No article on the listing page matched this keyword. Try a broader keyword or search again later.",
        site,
    )
}

/// Placeholder for a cascade whose last tier failed outright.
pub fn search_error(keyword: &str, site: &SiteConfig) -> DiscoveryResult {
    placeholder(
        keyword,
        format!("search error: «{keyword}»"),
        "Every discovery tier failed for this keyword. The site may be unreachable; search again later.",
        site,
    )
}

fn placeholder(keyword: &str, title: String, excerpt: &str, site: &SiteConfig) -> DiscoveryResult {
    let url = site
        .search_url(keyword)
        .unwrap_or_else(|_| site.origin.clone());
    DiscoveryResult {
        keyword: keyword.to_string(),
        articles: vec![ArticleSummary::new(title, url, SYSTEM_AUTHOR, excerpt)],
        total_found: 0,
        tier_used: Tier::None,
    }
}

/// Tier 3 strategy over the generic listing page.
pub struct FallbackListingStrategy<S> {
    source: S,
    site: SiteConfig,
    rules: ListingRules,
}

impl<S: PageSource> FallbackListingStrategy<S> {
    pub fn new(source: S, site: SiteConfig, rules: ListingRules) -> Self {
        Self { source, site, rules }
    }
}

#[async_trait]
impl<S: PageSource> DiscoveryStrategy for FallbackListingStrategy<S> {
    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    /// Never reports [`Error::EmptyResult`]: zero survivors become the
    /// "no results" placeholder.
    #[instrument(level = "info", skip_all, fields(keyword = %request.keyword, tier = %Tier::Fallback))]
    async fn attempt(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, Error> {
        let url = self.site.listing_url()?;
        let html = self.source.fetch(&url, cancel).await?;

        let articles = extract_listing(
            &html,
            &self.site,
            &self.rules,
            &request.keyword,
            request.limit.get(),
        );
        if articles.is_empty() {
            info!("No relevant listing candidates; answering with placeholder");
            return Ok(no_results(&request.keyword, &self.site));
        }
        Ok(DiscoveryResult::found(request.keyword.clone(), articles, Tier::Fallback))
    }
}

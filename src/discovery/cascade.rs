//! The discovery cascade: an explicit state machine over ordered tiers.
//!
//! ```text
//! Idle ──▶ Trying(0) ──▶ Trying(1) ──▶ … ──▶ Trying(n-1) ──▶ Done
//!              │             │                                 ▲
//!              └─────────────┴──── non-empty result ───────────┘
//! ```
//!
//! A tier that errors or returns no articles hands over to the next one.
//! The last tier's outcome always ends the run: real results, its own
//! placeholder, or (when it errored) the "search error" placeholder. No tier
//! is entered twice. The only error a caller can see is [`Cancelled`].

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::fallback::{self, ListingRules};
use super::{DiscoveryStrategy, FallbackListingStrategy, SearchPageStrategy, SummaryRules};
use crate::config::{ScraperConfig, SiteConfig};
use crate::error::{Cancelled, Error};
use crate::fetch::{ChromiumLauncher, RenderedFetcher, StaticFetcher};
use crate::models::{DiscoveryRequest, DiscoveryResult, Tier};

enum CascadeState {
    Idle,
    Trying(usize),
    Done(DiscoveryResult),
}

/// Orchestrates discovery tiers for keyword searches.
pub struct DiscoveryCascade {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
    site: SiteConfig,
}

impl DiscoveryCascade {
    /// Cascade over `strategies`, tried in the given order.
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>, site: SiteConfig) -> Self {
        Self { strategies, site }
    }

    /// Standard cascade: rendered search page (when the browser is enabled),
    /// static search page, then the fallback listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Selector`] for unparseable configured selectors and
    /// [`Error::Config`] when the HTTP client cannot be built.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, Error> {
        let search_rules = SummaryRules::compile(&config.selectors.search)?;
        let listing_rules = ListingRules::compile(&config.selectors.listing)?;
        let http = StaticFetcher::new(&config.http)?;

        let mut strategies: Vec<Box<dyn DiscoveryStrategy>> = Vec::with_capacity(3);
        if config.browser.enabled {
            let launcher = ChromiumLauncher::new(&config.browser, &config.http.user_agent);
            strategies.push(Box::new(SearchPageStrategy::new(
                RenderedFetcher::new(launcher, &config.browser),
                config.site.clone(),
                search_rules.clone(),
            )));
        }
        strategies.push(Box::new(SearchPageStrategy::new(
            http.clone(),
            config.site.clone(),
            search_rules,
        )));
        strategies.push(Box::new(FallbackListingStrategy::new(
            http.for_tier(Tier::Fallback),
            config.site.clone(),
            listing_rules,
        )));

        Ok(Self::new(strategies, config.site.clone()))
    }

    /// Tiers in the order they will be tried.
    pub fn tiers(&self) -> Vec<Tier> {
        self.strategies.iter().map(|s| s.tier()).collect()
    }

    /// Resolve `request` into a result, escalating through the tiers.
    ///
    /// Always yields a result with at most `request.limit` articles; when no
    /// tier found anything it holds a single synthetic placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancel` fires before a tier succeeds.
    #[instrument(level = "info", skip_all, fields(keyword = %request.keyword, limit = request.limit.get(), kind = %request.kind))]
    pub async fn discover(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, Cancelled> {
        let mut state = CascadeState::Idle;
        loop {
            state = match state {
                CascadeState::Idle if self.strategies.is_empty() => {
                    warn!("No discovery tiers configured");
                    CascadeState::Done(fallback::search_error(&request.keyword, &self.site))
                }
                CascadeState::Idle => CascadeState::Trying(0),
                CascadeState::Trying(index) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    self.step(index, request, cancel).await?
                }
                CascadeState::Done(mut result) => {
                    let limit = request.limit.get();
                    result.articles.truncate(limit);
                    result.total_found = result.total_found.min(limit);
                    info!(
                        tier = %result.tier_used,
                        count = result.articles.len(),
                        placeholder = result.is_placeholder(),
                        "Discovery finished"
                    );
                    return Ok(result);
                }
            };
        }
    }

    async fn step(
        &self,
        index: usize,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<CascadeState, Cancelled> {
        let strategy = &self.strategies[index];
        let tier = strategy.tier();
        let is_last = index + 1 == self.strategies.len();
        let next = || CascadeState::Trying(index + 1);

        info!(event_kind = "tier.attempt", %tier, "Trying discovery tier");
        let state = match strategy.attempt(request, cancel).await {
            Err(Error::Cancelled(c)) => {
                warn!(event_kind = "tier.failed", %tier, "Discovery cancelled");
                return Err(c);
            }
            Ok(result) if !result.articles.is_empty() && (is_last || !result.is_placeholder()) => {
                info!(event_kind = "tier.succeeded", %tier, count = result.articles.len(), "Discovery tier succeeded");
                CascadeState::Done(result)
            }
            Ok(_) | Err(Error::EmptyResult { .. }) => {
                info!(event_kind = "tier.empty", %tier, "Discovery tier found nothing");
                if is_last {
                    CascadeState::Done(fallback::no_results(&request.keyword, &self.site))
                } else {
                    next()
                }
            }
            Err(e) => {
                warn!(event_kind = "tier.failed", %tier, error = %e, "Discovery tier failed");
                if is_last {
                    CascadeState::Done(fallback::search_error(&request.keyword, &self.site))
                } else {
                    next()
                }
            }
        };
        Ok(state)
    }
}

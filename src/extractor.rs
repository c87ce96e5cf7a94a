//! Single-URL article extraction.
//!
//! An [`ArticleExtractor`] tries its page sources in order (the scripted
//! browser, then plain HTTP) and returns the first snapshot that yields a
//! non-empty body. There is no listing-page substitute for a known article,
//! so when every source comes up empty the failure surfaces as
//! [`Error::ContentExtraction`] instead of degrading.
//!
//! Field resolution is independent per field:
//!
//! | Field | Rules (first non-empty wins) |
//! |-------|------------------------------|
//! | body | `.znc`, `article`, `.View_main__ScoZh` (all matches joined by newlines) |
//! | title | `h1`, `<title>` with the site suffix stripped |
//! | author | seven author-like selectors, most specific first |
//! | published_at | `time[datetime]`, then the published-at container's `time` |

use chrono::{DateTime, Utc};
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{ArticleSelectors, ScraperConfig, SiteConfig};
use crate::error::{Cancelled, Error};
use crate::fetch::{ChromiumLauncher, PageSource, RenderedFetcher, StaticFetcher};
use crate::models::{ArticleContent, Tier};
use crate::selectors::RuleList;
use crate::utils::parse_timestamp;

/// Compiled rules for article pages.
#[derive(Debug, Clone)]
pub struct ContentRules {
    pub title: RuleList,
    pub body: RuleList,
    pub author: RuleList,
    pub published_at: RuleList,
    title_suffix: String,
}

impl ContentRules {
    pub fn compile(selectors: &ArticleSelectors, site: &SiteConfig) -> Result<Self, Error> {
        Ok(Self {
            title: RuleList::compile(&selectors.title)?,
            body: RuleList::compile(&selectors.body)?,
            author: RuleList::compile(&selectors.author)?,
            published_at: RuleList::compile(&selectors.published_at)?,
            title_suffix: site.title_suffix.clone(),
        })
    }
}

/// Every field found on one article snapshot, body or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFields {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl PageFields {
    /// Promote to [`ArticleContent`]; `None` when there is no body.
    ///
    /// A page without any title is named after its URL.
    pub fn into_content(self, url: &Url) -> Option<ArticleContent> {
        let body = self.body.filter(|b| !b.trim().is_empty())?;
        Some(ArticleContent {
            title: self.title.unwrap_or_else(|| url.to_string()),
            body,
            url: url.clone(),
            author: self.author,
            published_at: self.published_at,
        })
    }
}

/// Resolve every article field in `html`.
pub fn extract_fields(html: &str, rules: &ContentRules) -> PageFields {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = rules.title.resolve_field(root).and_then(|raw| {
        let stripped = raw
            .strip_suffix(rules.title_suffix.as_str())
            .unwrap_or(&raw)
            .trim()
            .to_string();
        (!stripped.is_empty()).then_some(stripped)
    });

    PageFields {
        title,
        body: rules.body.resolve_field(root),
        author: rules.author.resolve_field(root),
        published_at: rules
            .published_at
            .resolve_field(root)
            .and_then(|raw| parse_timestamp(&raw)),
    }
}

/// Extracts structured content from a single article URL.
pub struct ArticleExtractor {
    sources: Vec<Box<dyn PageSource>>,
    rules: ContentRules,
}

impl ArticleExtractor {
    /// Extractor over `sources`, tried in the given order.
    pub fn new(sources: Vec<Box<dyn PageSource>>, rules: ContentRules) -> Self {
        Self { sources, rules }
    }

    /// Standard extractor: rendered page (when the browser is enabled), then
    /// plain HTTP.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, Error> {
        let rules = ContentRules::compile(&config.selectors.article, &config.site)?;

        let mut sources: Vec<Box<dyn PageSource>> = Vec::with_capacity(2);
        if config.browser.enabled {
            let launcher = ChromiumLauncher::new(&config.browser, &config.http.user_agent);
            sources.push(Box::new(RenderedFetcher::new(launcher, &config.browser)));
        }
        sources.push(Box::new(StaticFetcher::new(&config.http)?));

        Ok(Self::new(sources, rules))
    }

    pub fn tiers(&self) -> Vec<Tier> {
        self.sources.iter().map(|s| s.tier()).collect()
    }

    /// Extract the article at `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::ContentExtraction`] when no source yields a non-empty body
    /// - [`Error::Cancelled`] as soon as `cancel` fires
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn extract(&self, url: &Url, cancel: &CancellationToken) -> Result<ArticleContent, Error> {
        for source in &self.sources {
            if cancel.is_cancelled() {
                return Err(Cancelled.into());
            }
            let tier = source.tier();
            info!(event_kind = "tier.attempt", %tier, "Trying extraction tier");

            let html = match source.fetch(url, cancel).await {
                Ok(html) => html,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(event_kind = "tier.failed", %tier, error = %e, "Extraction tier failed");
                    continue;
                }
            };

            let fields = extract_fields(&html, &self.rules);
            debug!(
                %tier,
                title = ?fields.title,
                author = ?fields.author,
                has_body = fields.body.is_some(),
                "Resolved article fields"
            );
            match fields.into_content(url) {
                Some(content) => {
                    info!(event_kind = "tier.succeeded", %tier, chars = content.body.chars().count(), "Extracted article");
                    return Ok(content);
                }
                None => info!(event_kind = "tier.empty", %tier, "No article body on page"),
            }
        }

        Err(Error::ContentExtraction {
            url: url.clone(),
            reason: "no content".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FULL_ARTICLE: &str = r#"
        <html>
            <head><title>Rustで始める非同期処理 | Zenn</title></head>
            <body>
                <header><a href="/alice"><span>alice</span></a></header>
                <h1>  Rustで始める非同期処理 </h1>
                <time datetime="2025-04-01T10:00:00+09:00">2025/04/01</time>
                <div class="znc">
                    <p>tokio を使います。</p>
                    <pre>async fn main() {}</pre>
                </div>
            </body>
        </html>
    "#;

    fn rules() -> ContentRules {
        ContentRules::compile(&ArticleSelectors::default(), &SiteConfig::default()).unwrap()
    }

    fn article_url() -> Url {
        Url::parse("https://zenn.dev/alice/articles/rust-async").unwrap()
    }

    enum Canned {
        Html(&'static str),
        Fail,
        Cancel,
    }

    struct CannedSource {
        tier: Tier,
        canned: Canned,
        calls: Arc<AtomicUsize>,
    }

    impl CannedSource {
        fn boxed(tier: Tier, canned: Canned) -> (Box<dyn PageSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = CannedSource {
                tier,
                canned,
                calls: Arc::clone(&calls),
            };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl PageSource for CannedSource {
        fn tier(&self) -> Tier {
            self.tier
        }

        async fn fetch(&self, url: &Url, _cancel: &CancellationToken) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.canned {
                Canned::Html(html) => Ok(html.to_string()),
                Canned::Fail => Err(Error::StaticFetch {
                    url: url.clone(),
                    reason: "HTTP 404".to_string(),
                }),
                Canned::Cancel => Err(Cancelled.into()),
            }
        }
    }

    #[test]
    fn test_extract_fields_full_article() {
        let fields = extract_fields(FULL_ARTICLE, &rules());
        assert_eq!(fields.title.as_deref(), Some("Rustで始める非同期処理"));
        assert_eq!(fields.author.as_deref(), Some("alice"));
        assert_eq!(fields.body.as_deref(), Some("tokio を使います。\nasync fn main() {}"));
        assert!(fields.published_at.is_some());
    }

    #[test]
    fn test_title_suffix_is_stripped_from_document_title() {
        let html = "<html><head><title>Only a title | Zenn</title></head><body><article>text</article></body></html>";
        let fields = extract_fields(html, &rules());
        assert_eq!(fields.title.as_deref(), Some("Only a title"));
        assert_eq!(fields.body.as_deref(), Some("text"));
    }

    #[test]
    fn test_metadata_resolved_without_body() {
        let html = r#"<html><body><span class="UserName_x">bob</span><time datetime="2025-01-01">x</time></body></html>"#;
        let fields = extract_fields(html, &rules());
        assert!(fields.body.is_none());
        assert_eq!(fields.author.as_deref(), Some("bob"));
        assert!(fields.published_at.is_some());
        assert!(fields.into_content(&article_url()).is_none());
    }

    #[tokio::test]
    async fn test_no_body_selector_is_content_extraction_error() {
        let (source, _) = CannedSource::boxed(Tier::Static, Canned::Html("<html><body><p>no containers</p></body></html>"));
        let extractor = ArticleExtractor::new(vec![source], rules());

        let err = extractor
            .extract(&article_url(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            Error::ContentExtraction { reason, .. } => assert_eq!(reason, "no content"),
            other => panic!("expected ContentExtraction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_secondary_body_selector_only() {
        let html = r#"<html><head><title>Secondary | Zenn</title></head><body><div class="View_main__ScoZh"><p>Only here</p></div></body></html>"#;
        let (source, _) = CannedSource::boxed(Tier::Static, Canned::Html(html));
        let extractor = ArticleExtractor::new(vec![source], rules());

        let content = extractor
            .extract(&article_url(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(content.body, "Only here");
        assert_eq!(content.title, "Secondary");
    }

    #[tokio::test]
    async fn test_rendered_failure_falls_back_to_static_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alice/articles/rust-async"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FULL_ARTICLE))
            .expect(1)
            .mount(&server)
            .await;

        let (rendered, rendered_calls) = CannedSource::boxed(Tier::Rendered, Canned::Fail);
        let http = StaticFetcher::new(&HttpConfig::default()).unwrap();
        let extractor = ArticleExtractor::new(vec![rendered, Box::new(http)], rules());

        let url = Url::parse(&format!("{}/alice/articles/rust-async", server.uri())).unwrap();
        let content = extractor.extract(&url, &CancellationToken::new()).await.unwrap();

        assert_eq!(rendered_calls.load(Ordering::SeqCst), 1);
        assert_eq!(content.title, "Rustで始める非同期処理");
        assert_eq!(content.url, url);
    }

    #[tokio::test]
    async fn test_empty_rendered_page_falls_back() {
        let (rendered, _) = CannedSource::boxed(Tier::Rendered, Canned::Html("<html></html>"));
        let (static_, static_calls) = CannedSource::boxed(Tier::Static, Canned::Html(FULL_ARTICLE));
        let extractor = ArticleExtractor::new(vec![rendered, static_], rules());

        let content = extractor
            .extract(&article_url(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(static_calls.load(Ordering::SeqCst), 1);
        assert!(content.body.contains("tokio"));
    }

    #[tokio::test]
    async fn test_cancellation_is_not_absorbed() {
        let (rendered, _) = CannedSource::boxed(Tier::Rendered, Canned::Cancel);
        let (static_, static_calls) = CannedSource::boxed(Tier::Static, Canned::Html(FULL_ARTICLE));
        let extractor = ArticleExtractor::new(vec![rendered, static_], rules());

        let err = extractor
            .extract(&article_url(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(static_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_without_browser_uses_static_only() {
        let mut config = ScraperConfig::default();
        config.browser.enabled = false;
        let extractor = ArticleExtractor::from_config(&config).unwrap();
        assert_eq!(extractor.tiers(), vec![Tier::Static]);
    }
}

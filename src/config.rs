//! Runtime configuration: site layout, HTTP identity, browser behavior and selector tables.
//!
//! Every selector the pipeline uses lives here as data rather than code, so a
//! markup change on the site is a configuration edit. The defaults target the
//! current Zenn markup. A YAML file can override any subset of fields:
//!
//! ```yaml
//! browser:
//!   settle_delay_ms: 3500
//! selectors:
//!   article:
//!     body:
//!       - { query: ".znc", join: true }
//!       - { query: "main", join: true }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::error::Error;
use crate::selectors::RuleSpec;

/// Browser-identifying user agent sent by the static tiers and the browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub browser: BrowserSettings,
    pub selectors: SelectorConfig,
}

impl ScraperConfig {
    /// Decode a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and decode a YAML configuration file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_yaml_str(&raw)?;
        info!(origin = %config.site.origin, "Loaded configuration");
        Ok(config)
    }
}

/// Where things live on the target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin every relative link is joined against.
    pub origin: Url,
    pub search_path: String,
    pub search_param: String,
    /// Generic content listing used by the fallback tier.
    pub listing_path: String,
    /// Substring every article link's `href` must contain.
    pub article_path_marker: String,
    /// Suffix stripped from `<title>` when it is used as an article title.
    pub title_suffix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("https://zenn.dev").expect("static origin URL is valid"),
            search_path: "/search".to_string(),
            search_param: "q".to_string(),
            listing_path: "/".to_string(),
            article_path_marker: "/articles/".to_string(),
            title_suffix: " | Zenn".to_string(),
        }
    }
}

impl SiteConfig {
    /// Search-results URL for `keyword`.
    pub fn search_url(&self, keyword: &str) -> Result<Url, Error> {
        let mut url = self.join(&self.search_path)?;
        let query = format!("{}={}", self.search_param, urlencoding::encode(keyword));
        url.set_query(Some(&query));
        Ok(url)
    }

    /// URL of the generic listing page.
    pub fn listing_url(&self) -> Result<Url, Error> {
        self.join(&self.listing_path)
    }

    /// Resolve `href` against the origin.
    pub fn absolutize(&self, href: &str) -> Option<Url> {
        self.origin.join(href.trim()).ok()
    }

    /// Whether `href` points at an article.
    pub fn is_article_href(&self, href: &str) -> bool {
        href.contains(&self.article_path_marker)
    }

    /// Whether `url` belongs to this site.
    pub fn owns(&self, url: &Url) -> bool {
        url.host_str().is_some() && url.host_str() == self.origin.host_str()
    }

    fn join(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::Config(format!("cannot join `{path}` onto {}: {e}", self.origin)))
    }
}

/// HTTP identity and limits for the static tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "ja,en-US;q=0.9,en;q=0.8".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Scripted browser settings for the rendered tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// When false the rendered tier is left out of every cascade.
    pub enabled: bool,
    /// Explicit Chromium binary; auto-detected when unset.
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub navigation_timeout_secs: u64,
    /// Extra wait after navigation settles, for late client-side hydration.
    pub settle_delay_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_executable: None,
            headless: true,
            navigation_timeout_secs: 30,
            settle_delay_ms: 2000,
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub search: SearchSelectors,
    pub listing: ListingSelectors,
    pub article: ArticleSelectors,
}

/// Rules for search-results pages (rendered and static tiers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSelectors {
    /// Article-link candidates, most specific first.
    pub links: Vec<RuleSpec>,
    /// Heading inside a link that carries the title.
    pub title: Vec<RuleSpec>,
    /// Card element enclosing one result.
    pub container: Vec<RuleSpec>,
    pub author: Vec<RuleSpec>,
    pub excerpt: Vec<RuleSpec>,
    pub tags: Vec<RuleSpec>,
    pub published_at: Vec<RuleSpec>,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            links: texts(&[
                r#"a[href*="/articles/"]"#,
                ".ArticleCard a",
                r#"[data-testid="article-card"] a"#,
                r#".search-result a[href*="/articles/"]"#,
                r#"article a[href*="/articles/"]"#,
            ]),
            title: texts(&[r#"h2, h3, .title, [data-testid="article-title"]"#]),
            container: texts(&["article"]),
            author: texts(&[r#".author, [data-testid="author"], .username"#]),
            excerpt: texts(&[".excerpt, .description, p"]),
            tags: texts(&[r#".tag, .badge, [data-testid="tag"]"#]),
            published_at: vec![RuleSpec::attr("time", "datetime")],
        }
    }
}

/// Rules for the generic listing page (fallback tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub links: Vec<RuleSpec>,
    /// Heading nested inside a link.
    pub title: Vec<RuleSpec>,
    /// Ancestor searched for a heading when the link itself has none.
    pub title_container: Vec<RuleSpec>,
    /// Ancestor searched for author and excerpt.
    pub detail_container: Vec<RuleSpec>,
    pub author: Vec<RuleSpec>,
    pub excerpt: Vec<RuleSpec>,
    /// Titles shorter than this (in characters) are decorative links.
    pub min_title_chars: usize,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            links: texts(&[
                r#"a[href*="/articles/"]"#,
                r#"a[href^="/articles/"]"#,
                r#"[href*="/articles/"]"#,
            ]),
            title: texts(&[r#"h1, h2, h3, h4, .title, [class*="title"]"#]),
            title_container: texts(&["article, div"]),
            detail_container: texts(&["article, div, section"]),
            author: texts(&[r#"[class*="author"], [class*="user"]"#]),
            excerpt: texts(&[r#"p, [class*="description"], [class*="excerpt"]"#]),
            min_title_chars: 3,
        }
    }
}

/// Rules for a single article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleSelectors {
    pub title: Vec<RuleSpec>,
    /// Body containers: primary content class, `article` landmark, secondary class.
    pub body: Vec<RuleSpec>,
    pub author: Vec<RuleSpec>,
    pub published_at: Vec<RuleSpec>,
}

impl Default for ArticleSelectors {
    fn default() -> Self {
        Self {
            title: texts(&["h1", "title"]),
            body: vec![
                RuleSpec::joined(".znc"),
                RuleSpec::joined("article"),
                RuleSpec::joined(".View_main__ScoZh"),
            ],
            author: texts(&[
                r#"a[href*="/"] span"#,
                ".UserLink_userName__zUSwu",
                r#"[data-testid="author-name"]"#,
                r#"header a[href^="/"]"#,
                r#"[class*="userName"]"#,
                r#"[class*="UserName"]"#,
                r#"[class*="author"]"#,
            ]),
            published_at: vec![
                RuleSpec::attr("time", "datetime"),
                RuleSpec::attr(".PublishedAt_container__UgXhb time", "datetime"),
            ],
        }
    }
}

fn texts(queries: &[&str]) -> Vec<RuleSpec> {
    queries.iter().map(|q| RuleSpec::text(q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::RuleList;

    #[test]
    fn test_default_selectors_compile() {
        let config = ScraperConfig::default();
        let s = &config.selectors;
        for specs in [
            &s.search.links,
            &s.search.title,
            &s.search.container,
            &s.search.author,
            &s.search.excerpt,
            &s.search.tags,
            &s.search.published_at,
            &s.listing.links,
            &s.listing.title,
            &s.listing.title_container,
            &s.listing.detail_container,
            &s.listing.author,
            &s.listing.excerpt,
            &s.article.title,
            &s.article.body,
            &s.article.author,
            &s.article.published_at,
        ] {
            RuleList::compile(specs).unwrap();
        }
        assert_eq!(s.article.body.len(), 3);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
browser:
  settle_delay_ms: 3500
selectors:
  article:
    body:
      - { query: "main", join: true }
"#;
        let config = ScraperConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.browser.settle_delay(), Duration::from_millis(3500));
        assert!(config.browser.enabled);
        assert_eq!(config.selectors.article.body, vec![RuleSpec::joined("main")]);
        assert_eq!(config.selectors.article.author.len(), 7);
        assert_eq!(config.site.origin.as_str(), "https://zenn.dev/");
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = ScraperConfig::from_yaml_str("browser: [not, a, map]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let site = SiteConfig::default();
        let url = site.search_url("React Hooks入門").unwrap();
        assert_eq!(
            url.as_str(),
            "https://zenn.dev/search?q=React%20Hooks%E5%85%A5%E9%96%80"
        );
        assert_eq!(site.listing_url().unwrap().as_str(), "https://zenn.dev/");
    }

    #[test]
    fn test_absolutize_and_ownership() {
        let site = SiteConfig::default();
        let abs = site.absolutize("/alice/articles/abc").unwrap();
        assert_eq!(abs.as_str(), "https://zenn.dev/alice/articles/abc");
        assert!(site.owns(&abs));

        let external = site.absolutize("https://example.com/articles/x").unwrap();
        assert!(!site.owns(&external));
        assert!(site.is_article_href("/alice/articles/abc"));
        assert!(!site.is_article_href("/topics/rust"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(&path, "http:\n  timeout_secs: 5\n").await.unwrap();

        let config = ScraperConfig::load(&path).await.unwrap();
        assert_eq!(config.http.timeout(), Duration::from_secs(5));

        let missing = ScraperConfig::load(&tmp.path().join("nope.yaml")).await;
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}

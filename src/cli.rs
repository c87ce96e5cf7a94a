//! Command-line interface definitions for Zenn Scout.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! LLM settings can also be provided via environment variables.

use clap::Parser;
use std::num::NonZeroUsize;
use url::Url;

use crate::config::SiteConfig;
use crate::models::{DEFAULT_LIMIT, DiscoveryKind};

/// Command-line arguments for the Zenn Scout application.
///
/// # Examples
///
/// ```sh
/// # Discover three articles for a keyword
/// zenn_scout "React Hooks"
///
/// # Discover, extract each hit and keep a JSON report
/// zenn_scout rust -l 5 --fetch-articles -j ./reports
///
/// # Extract and summarize a single article as Markdown
/// zenn_scout https://zenn.dev/alice/articles/rust-async --summarize --markdown
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URL on the configured site, or a search keyword
    pub input: String,

    /// Maximum number of articles to discover
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    pub limit: NonZeroUsize,

    /// Content type to discover (`articles` or `books`)
    #[arg(short, long, default_value_t = DiscoveryKind::Articles)]
    pub kind: DiscoveryKind,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Skip the scripted-browser tier
    #[arg(long)]
    pub no_browser: bool,

    /// Overall deadline in seconds; cancels in-flight work when it expires
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// After discovery, extract every discovered article
    #[arg(long)]
    pub fetch_articles: bool,

    /// Also write the JSON report under this directory
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Print a Markdown report instead of JSON
    #[arg(long)]
    pub markdown: bool,

    /// Summarize results with an OpenAI-compatible LLM
    #[arg(long)]
    pub summarize: bool,

    /// LLM API root
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    /// LLM API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4.1")]
    pub llm_model: String,
}

/// What the positional input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Article(Url),
    Keyword(String),
}

impl Cli {
    /// Classify the input: an `http(s)` URL on the site's host is an
    /// article, anything else is a keyword.
    pub fn target(&self, site: &SiteConfig) -> Target {
        let input = self.input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            if let Ok(url) = Url::parse(input) {
                if site.owns(&url) {
                    return Target::Article(url);
                }
            }
        }
        Target::Keyword(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["zenn_scout", "React Hooks"]);

        assert_eq!(cli.input, "React Hooks");
        assert_eq!(cli.limit.get(), 3);
        assert_eq!(cli.kind, DiscoveryKind::Articles);
        assert!(!cli.no_browser);
        assert!(cli.json_output_dir.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "zenn_scout",
            "rust",
            "-l",
            "5",
            "-k",
            "books",
            "-j",
            "/tmp/json",
            "--fetch-articles",
        ]);

        assert_eq!(cli.limit.get(), 5);
        assert_eq!(cli.kind, DiscoveryKind::Books);
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
        assert!(cli.fetch_articles);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(Cli::try_parse_from(["zenn_scout", "rust", "-l", "0"]).is_err());
    }

    #[test]
    fn test_target_classification() {
        let site = SiteConfig::default();
        let article = Cli::parse_from(["zenn_scout", "https://zenn.dev/alice/articles/x"]);
        assert!(matches!(article.target(&site), Target::Article(_)));

        let foreign = Cli::parse_from(["zenn_scout", "https://example.com/articles/x"]);
        assert_eq!(
            foreign.target(&site),
            Target::Keyword("https://example.com/articles/x".to_string())
        );

        let keyword = Cli::parse_from(["zenn_scout", " Next.js "]);
        assert_eq!(keyword.target(&site), Target::Keyword("Next.js".to_string()));
    }
}

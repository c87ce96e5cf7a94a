//! Report assembly and output generation for JSON and Markdown.
//!
//! A [`Report`] gathers everything one invocation produced: the discovery
//! result for a keyword, the extracted articles with their tech stacks and
//! optional summaries, and the extractions that failed.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`Report`] to a dated JSON file
//! - [`markdown`]: Renders a [`Report`] as Markdown for reading
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── react-hooks.json
//!     └── rust-async.json
//! ```

pub mod json;
pub mod markdown;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classifier::TechStack;
use crate::models::{ArticleContent, DiscoveryResult};
use crate::utils::slugify_title;

/// One extracted article with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleReport {
    pub article: ArticleContent,
    pub tech_stack: TechStack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// An article URL whose extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedExtraction {
    pub url: Url,
    pub error: String,
}

/// Everything produced for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub input: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryResult>,
    /// Summary of the discovery result as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub articles: Vec<ArticleReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedExtraction>,
}

impl Report {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            generated_at: Utc::now(),
            discovery: None,
            summary: None,
            articles: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// File-name stem: the article slug for URL inputs, the slugified
    /// keyword otherwise.
    pub fn slug(&self) -> String {
        let from_url = Url::parse(&self.input).ok().and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(slugify_title))
        });
        let slug = from_url.unwrap_or_else(|| slugify_title(self.input.trim()));
        if slug.is_empty() { "report".to_string() } else { slug }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_url_and_keyword() {
        assert_eq!(Report::new("https://zenn.dev/alice/articles/rust-async/").slug(), "rust-async");
        assert_eq!(Report::new("React Hooks").slug(), "react-hooks");
        assert_eq!(Report::new("!!!").slug(), "report");
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let json = serde_json::to_value(Report::new("rust")).unwrap();
        assert_eq!(json["input"], "rust");
        assert!(json.get("articles").is_none());
        assert!(json.get("discovery").is_none());
        assert!(json.get("generatedAt").is_some());
    }
}

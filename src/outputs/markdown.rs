//! Markdown rendering of reports.
//!
//! Rendering goes through [`fmt::Display`] adapters so a report can be
//! written straight to stdout or collected with `to_string()`.

use std::fmt;

use super::{ArticleReport, Report};
use crate::classifier::{Category, TechStack};
use crate::models::{ArticleSummary, DiscoveryResult};
use crate::utils::upcase;

/// Markdown view of a whole [`Report`].
pub struct ReportMarkdown<'a>(pub &'a Report);

/// Markdown view of a [`DiscoveryResult`].
pub struct DiscoveryMarkdown<'a>(pub &'a DiscoveryResult);

/// Markdown view of a [`TechStack`].
pub struct TechStackMarkdown<'a>(pub &'a TechStack);

impl fmt::Display for ReportMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Zenn report: {}\n", report.input)?;
        writeln!(f, "_Generated {}_\n", report.generated_at.to_rfc3339())?;

        if let Some(discovery) = &report.discovery {
            write!(f, "{}", DiscoveryMarkdown(discovery))?;
        }
        if let Some(summary) = &report.summary {
            writeln!(f, "## Summary\n\n{}\n", summary.trim())?;
        }
        for article in &report.articles {
            write_article(f, article)?;
        }
        if !report.failures.is_empty() {
            writeln!(f, "## Failed extractions\n")?;
            for failure in &report.failures {
                writeln!(f, "- <{}>: {}", failure.url, failure.error)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for DiscoveryMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        if result.is_placeholder() {
            writeln!(f, "## Discovery: «{}» (no results)\n", result.keyword)?;
        } else {
            writeln!(
                f,
                "## Discovery: «{}» ({} found, {} tier)\n",
                result.keyword, result.total_found, result.tier_used
            )?;
        }
        for (index, summary) in result.articles.iter().enumerate() {
            write_summary(f, index + 1, summary)?;
        }
        writeln!(f)
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, position: usize, summary: &ArticleSummary) -> fmt::Result {
    write!(f, "{position}. **[{}]({})**", summary.title, summary.url)?;
    if !summary.author.is_empty() {
        write!(f, " by {}", summary.author)?;
    }
    if let Some(published_at) = summary.published_at {
        write!(f, " · {}", published_at.format("%Y-%m-%d"))?;
    }
    writeln!(f)?;
    if !summary.excerpt().is_empty() {
        writeln!(f, "   > {}", summary.excerpt())?;
    }
    if !summary.tags.is_empty() {
        let tags: Vec<String> = summary.tags.iter().map(|t| format!("`{t}`")).collect();
        writeln!(f, "   {}", tags.join(" "))?;
    }
    Ok(())
}

fn write_article(f: &mut fmt::Formatter<'_>, report: &ArticleReport) -> fmt::Result {
    let article = &report.article;
    writeln!(f, "## {}\n", article.title)?;
    if let Some(author) = &article.author {
        writeln!(f, "**Author**: {author}  ")?;
    }
    if let Some(published_at) = article.published_at {
        writeln!(f, "**Published**: {}  ", published_at.format("%Y-%m-%d"))?;
    }
    writeln!(f, "**URL**: <{}>\n", article.url)?;

    write!(f, "{}", TechStackMarkdown(&report.tech_stack))?;

    if let Some(summary) = &report.summary {
        writeln!(f, "### Summary\n\n{}\n", summary.trim())?;
    }
    writeln!(f, "### Content\n\n{}\n", article.body)
}

impl fmt::Display for TechStackMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.0;
        writeln!(f, "### Tech stack (confidence {:.2})\n", stack.confidence)?;
        if stack.is_empty() {
            return writeln!(f, "_No known technologies detected._\n");
        }
        for category in Category::ALL {
            let names: Vec<&str> = stack.get(category).collect();
            if !names.is_empty() {
                writeln!(f, "- **{}**: {}", upcase(&category.to_string()), names.join(", "))?;
            }
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::config::SiteConfig;
    use crate::discovery::fallback::no_results;
    use crate::models::{ArticleContent, Tier};
    use url::Url;

    fn summary() -> ArticleSummary {
        ArticleSummary::new(
            "React Hooks入門",
            Url::parse("https://zenn.dev/alice/articles/hooks").unwrap(),
            "alice",
            "useState の基本",
        )
        .with_tags(vec!["React".to_string(), "frontend".to_string()])
    }

    #[test]
    fn test_discovery_markdown_lists_articles() {
        let result = DiscoveryResult::found("hooks", vec![summary()], Tier::Rendered);
        let md = DiscoveryMarkdown(&result).to_string();

        assert!(md.starts_with("## Discovery: «hooks» (1 found, rendered tier)"));
        assert!(md.contains("1. **[React Hooks入門](https://zenn.dev/alice/articles/hooks)** by alice"));
        assert!(md.contains("   > useState の基本"));
        assert!(md.contains("`React` `frontend`"));
    }

    #[test]
    fn test_placeholder_is_labelled() {
        let md = DiscoveryMarkdown(&no_results("hooks", &SiteConfig::default())).to_string();
        assert!(md.contains("(no results)"));
        assert!(md.contains("no results for «hooks»"));
    }

    #[test]
    fn test_tech_stack_markdown_skips_empty_categories() {
        let md = TechStackMarkdown(&classify("Docker と Redis", None)).to_string();
        assert!(md.contains("- **Databases**: redis"));
        assert!(md.contains("- **Infrastructure**: docker"));
        assert!(!md.contains("Languages"));

        let empty = TechStackMarkdown(&classify("", None)).to_string();
        assert!(empty.contains("No known technologies"));
    }

    #[test]
    fn test_report_markdown_sections() {
        let article = ArticleContent {
            title: "Rust async".to_string(),
            body: "tokio runtime".to_string(),
            url: Url::parse("https://zenn.dev/bob/articles/async").unwrap(),
            author: Some("bob".to_string()),
            published_at: None,
        };
        let mut report = Report::new("https://zenn.dev/bob/articles/async");
        report.articles.push(ArticleReport {
            tech_stack: classify(&article.body, Some(&article.title)),
            article,
            summary: Some("A short summary.".to_string()),
        });
        report.failures.push(super::super::FailedExtraction {
            url: Url::parse("https://zenn.dev/x/articles/y").unwrap(),
            error: "no content".to_string(),
        });

        let md = ReportMarkdown(&report).to_string();
        assert!(md.starts_with("# Zenn report: https://zenn.dev/bob/articles/async"));
        assert!(md.contains("## Rust async"));
        assert!(md.contains("**Author**: bob"));
        assert!(md.contains("### Summary\n\nA short summary."));
        assert!(md.contains("### Content\n\ntokio runtime"));
        assert!(md.contains("## Failed extractions"));
    }
}

//! Ordered selector rules and the resolver that evaluates them.
//!
//! Every field the pipeline extracts (article links, titles, authors,
//! bodies, timestamps) is described by an ordered [`RuleList`] instead of a
//! hand-written chain of queries. Order encodes confidence: the first rule
//! that produces something wins, even when a later rule would match more.
//!
//! Two resolution modes exist:
//!
//! - [`RuleList::resolve`]: the match set of the first rule matching at least
//!   one node (used for link discovery and tag collection)
//! - [`RuleList::resolve_field`]: the first non-empty value produced by a
//!   rule's [`Extraction`] (used for scalar fields such as author or body)
//!
//! Resolution is a pure function over a parsed document snapshot. It does not
//! care whether that snapshot came from a live browser or a plain HTTP body.

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::utils::collapse_whitespace;

/// How a value is pulled out of the nodes a rule matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Extraction {
    /// Whitespace-collapsed text of the first matched node.
    #[default]
    Text,
    /// Text of every matched node, one node per line.
    JoinedText,
    /// Value of the named attribute on the first matched node.
    Attr(String),
}

/// A rule as written in configuration.
///
/// A bare string is a text rule. The detailed form selects an attribute or
/// joins the text of every match:
///
/// ```yaml
/// - h1
/// - { query: "time", attr: "datetime" }
/// - { query: ".znc", join: true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Query(String),
    Detailed {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attr: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        join: bool,
    },
}

impl RuleSpec {
    pub fn text(query: &str) -> Self {
        RuleSpec::Query(query.to_string())
    }

    pub fn attr(query: &str, attr: &str) -> Self {
        RuleSpec::Detailed {
            query: query.to_string(),
            attr: Some(attr.to_string()),
            join: false,
        }
    }

    pub fn joined(query: &str) -> Self {
        RuleSpec::Detailed {
            query: query.to_string(),
            attr: None,
            join: true,
        }
    }

    fn query(&self) -> &str {
        match self {
            RuleSpec::Query(q) => q,
            RuleSpec::Detailed { query, .. } => query,
        }
    }

    fn extraction(&self) -> Extraction {
        match self {
            RuleSpec::Query(_) => Extraction::Text,
            RuleSpec::Detailed { attr: Some(a), .. } => Extraction::Attr(a.clone()),
            RuleSpec::Detailed { join: true, .. } => Extraction::JoinedText,
            RuleSpec::Detailed { .. } => Extraction::Text,
        }
    }
}

/// A compiled `(query, extraction)` pair.
#[derive(Clone)]
pub struct SelectorRule {
    query: String,
    selector: Selector,
    extraction: Extraction,
}

impl fmt::Debug for SelectorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorRule")
            .field("query", &self.query)
            .field("extraction", &self.extraction)
            .finish()
    }
}

impl SelectorRule {
    /// Compile `query` as a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Selector`] when the query does not parse.
    pub fn parse(query: &str, extraction: Extraction) -> Result<Self, Error> {
        let selector = Selector::parse(query).map_err(|e| Error::Selector {
            query: query.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            query: query.to_string(),
            selector,
            extraction,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Descendants of `scope` matching this rule, in document order.
    pub fn matches<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        scope.select(&self.selector).collect()
    }

    /// Whether `element` itself satisfies this rule's selector.
    pub fn matches_element(&self, element: &ElementRef<'_>) -> bool {
        self.selector.matches(element)
    }

    /// Apply this rule's extraction inside `scope`; empty values are `None`.
    pub fn extract(&self, scope: ElementRef<'_>) -> Option<String> {
        let value = match &self.extraction {
            Extraction::Text => scope.select(&self.selector).next().map(element_text),
            Extraction::JoinedText => {
                let joined = scope
                    .select(&self.selector)
                    .map(element_block_text)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                Some(joined)
            }
            Extraction::Attr(name) => scope
                .select(&self.selector)
                .next()
                .and_then(|el| el.value().attr(name))
                .map(|v| v.trim().to_string()),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// An ordered, immutable list of selector rules.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    rules: Vec<SelectorRule>,
}

impl RuleList {
    /// Compile a list of configured rules, preserving their order.
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, Error> {
        let rules = specs
            .iter()
            .map(|spec| SelectorRule::parse(spec.query(), spec.extraction()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Compile plain text rules.
    #[cfg(test)]
    pub fn from_queries(queries: &[&str]) -> Result<Self, Error> {
        let specs = queries.iter().map(|q| RuleSpec::text(q)).collect::<Vec<_>>();
        Self::compile(&specs)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &SelectorRule> {
        self.rules.iter()
    }

    /// Match set of the first rule matching at least one descendant of `scope`.
    ///
    /// Returns an empty vector when no rule matches; callers decide whether
    /// that is a failure.
    pub fn resolve<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.resolve_with_rule(scope)
            .map(|(_, nodes)| nodes)
            .unwrap_or_default()
    }

    /// Like [`RuleList::resolve`], also reporting which rule won.
    pub fn resolve_with_rule<'a>(
        &self,
        scope: ElementRef<'a>,
    ) -> Option<(&SelectorRule, Vec<ElementRef<'a>>)> {
        self.rules.iter().find_map(|rule| {
            let nodes = rule.matches(scope);
            (!nodes.is_empty()).then_some((rule, nodes))
        })
    }

    /// First non-empty value produced by a rule's extraction inside `scope`.
    pub fn resolve_field(&self, scope: ElementRef<'_>) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.extract(scope))
    }

    /// Whether any rule's selector matches `element` itself.
    pub fn matches_element(&self, element: &ElementRef<'_>) -> bool {
        self.rules.iter().any(|rule| rule.matches_element(element))
    }

    /// Nearest of `element` and its ancestors matched by any rule.
    pub fn closest<'a>(&self, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find(|candidate| self.matches_element(candidate))
    }
}

/// Whitespace-collapsed text content of `element`.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text content of `element` keeping line structure, with blank lines dropped.
fn element_block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
            <section class="results">
                <article class="card">
                    <a class="primary" href="/alice/articles/one"><h2>One</h2></a>
                    <span class="author">   </span>
                    <span class="username">alice</span>
                    <time datetime="2025-01-02">Jan 2</time>
                </article>
                <a class="secondary" href="/bob/articles/two">Two</a>
                <a class="secondary" href="/carol/articles/three">Three</a>
                <a class="secondary" href="/dave/articles/four">Four</a>
            </section>
            <div class="znc"><p>First paragraph</p>

            <p>Second paragraph</p></div>
        </body></html>
    "#;

    #[test]
    fn test_first_listed_rule_wins_over_larger_match() {
        let doc = Html::parse_document(PAGE);
        let rules = RuleList::from_queries(&["a.primary", "a.secondary"]).unwrap();

        let (rule, nodes) = rules.resolve_with_rule(doc.root_element()).unwrap();
        assert_eq!(rule.query(), "a.primary");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_falls_through_to_later_rule() {
        let doc = Html::parse_document(PAGE);
        let rules = RuleList::from_queries(&[".does-not-exist", "a.secondary"]).unwrap();
        assert_eq!(rules.resolve(doc.root_element()).len(), 3);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let doc = Html::parse_document(PAGE);
        let rules = RuleList::from_queries(&[".nope", "#missing"]).unwrap();
        assert!(rules.resolve(doc.root_element()).is_empty());
        assert!(rules.resolve_field(doc.root_element()).is_none());
    }

    #[test]
    fn test_resolve_field_skips_blank_values() {
        let doc = Html::parse_document(PAGE);
        let rules = RuleList::from_queries(&[".author", ".username"]).unwrap();
        assert_eq!(rules.resolve_field(doc.root_element()).as_deref(), Some("alice"));
    }

    #[test]
    fn test_attribute_and_joined_extraction() {
        let doc = Html::parse_document(PAGE);
        let dates = RuleList::compile(&[RuleSpec::attr("time", "datetime")]).unwrap();
        assert_eq!(dates.resolve_field(doc.root_element()).as_deref(), Some("2025-01-02"));

        let body = RuleList::compile(&[RuleSpec::joined(".znc")]).unwrap();
        assert_eq!(
            body.resolve_field(doc.root_element()).as_deref(),
            Some("First paragraph\nSecond paragraph")
        );
    }

    #[test]
    fn test_closest_includes_self_and_ancestors() {
        let doc = Html::parse_document(PAGE);
        let links = RuleList::from_queries(&["a.primary"]).unwrap();
        let link = links.resolve(doc.root_element())[0];

        let containers = RuleList::from_queries(&["article"]).unwrap();
        let card = containers.closest(link).unwrap();
        assert_eq!(card.value().attr("class"), Some("card"));

        let itself = links.closest(link).unwrap();
        assert_eq!(itself.value().attr("href"), Some("/alice/articles/one"));

        let orphan = RuleList::from_queries(&["a.secondary"]).unwrap();
        let secondary = orphan.resolve(doc.root_element())[0];
        assert!(containers.closest(secondary).is_none());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        for query in ["a[", "div >"] {
            let err = SelectorRule::parse(query, Extraction::Text).unwrap_err();
            assert!(matches!(err, Error::Selector { query: ref q, .. } if q == query));
        }
    }

    #[test]
    fn test_rule_spec_yaml_forms() {
        let yaml = r#"
- h1
- { query: "time", attr: "datetime" }
- { query: ".znc", join: true }
"#;
        let specs: Vec<RuleSpec> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(specs[0], RuleSpec::text("h1"));
        assert_eq!(specs[1], RuleSpec::attr("time", "datetime"));
        assert_eq!(specs[2], RuleSpec::joined(".znc"));
        assert_eq!(RuleList::compile(&specs).unwrap().len(), 3);
    }
}

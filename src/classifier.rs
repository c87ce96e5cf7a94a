//! Keyword-dictionary technology classifier.
//!
//! Scans an article's title and body for a fixed vocabulary of technology
//! names in seven categories and scores how much signal the text carried.
//! Pure and stateless: the vocabulary is compiled once into a process-wide
//! table and never mutated.
//!
//! Matching is case-insensitive and whole-word. A term only matches when it
//! is not flanked by ASCII letters, digits or underscores, so `go` does not
//! fire inside `google` while `Redisを使う` still yields `redis`. Dots and
//! spaces inside multi-part terms are interchangeable (`next.js` matches
//! `next js`).
//!
//! Confidence is `min(matches / 10 + min(chars / 5000, 0.3), 1)` rounded to
//! two decimals, where `chars` is the length of the lower-cased
//! `title + " " + content`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Technology category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Languages,
    Frameworks,
    Libraries,
    Tools,
    Databases,
    Infrastructure,
    Platforms,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Languages,
        Category::Frameworks,
        Category::Libraries,
        Category::Tools,
        Category::Databases,
        Category::Infrastructure,
        Category::Platforms,
    ];

    /// Terms recognised for this category, lower-case.
    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Category::Languages => &[
                "javascript", "typescript", "python", "java", "php", "ruby", "go", "rust",
                "c++", "c#", "swift", "kotlin", "dart", "scala", "elixir", "clojure",
                "haskell", "lua", "perl", "shell", "bash", "powershell", "r", "matlab",
                "sql", "html", "css", "sass", "scss", "less",
            ],
            Category::Frameworks => &[
                "react", "vue", "angular", "svelte", "next.js", "nuxt", "gatsby", "remix",
                "express", "fastify", "koa", "nestjs", "django", "flask", "fastapi",
                "rails", "laravel", "symfony", "spring", "spring boot", "gin", "echo",
                "actix", "rocket", "phoenix", "ember", "backbone", "jquery", "bootstrap",
                "tailwind", "bulma", "chakra ui", "material-ui", "ant design", "vuetify",
            ],
            Category::Libraries => &[
                "redux", "mobx", "zustand", "recoil", "apollo", "relay", "graphql",
                "axios", "fetch", "prisma", "typeorm", "sequelize", "mongoose", "knex",
                "lodash", "ramda", "moment", "dayjs", "date-fns", "joi", "yup", "zod",
                "jest", "mocha", "chai", "cypress", "playwright", "puppeteer", "selenium",
                "webpack", "vite", "rollup", "parcel", "babel", "typescript", "eslint",
                "prettier", "husky", "lint-staged",
            ],
            Category::Tools => &[
                "git", "github", "gitlab", "bitbucket", "vscode", "vim", "emacs",
                "intellij", "webstorm", "sublime", "atom", "figma", "sketch", "adobe xd",
                "postman", "insomnia", "swagger", "storybook", "chromatic", "sentry",
                "datadog", "newrelic", "grafana", "prometheus", "elk", "splunk",
                "sonarqube", "codecov", "browserstack", "sauce labs",
            ],
            Category::Databases => &[
                "mysql", "postgresql", "sqlite", "mongodb", "redis", "elasticsearch",
                "cassandra", "dynamodb", "firestore", "supabase", "planetscale",
                "fauna", "neo4j", "influxdb", "clickhouse", "snowflake", "bigquery",
            ],
            Category::Infrastructure => &[
                "aws", "azure", "gcp", "heroku", "vercel", "netlify", "cloudflare",
                "docker", "kubernetes", "terraform", "ansible", "jenkins", "github actions",
                "gitlab ci", "circle ci", "travis ci", "nginx", "apache", "load balancer",
                "cdn", "lambda", "cloud functions", "cloud run", "ecs", "fargate",
            ],
            Category::Platforms => &[
                "ios", "android", "react native", "flutter", "ionic", "xamarin",
                "electron", "tauri", "pwa", "chrome extension", "firefox addon",
                "slack app", "discord bot", "telegram bot", "line bot", "chatbot",
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Languages => "languages",
            Category::Frameworks => "frameworks",
            Category::Libraries => "libraries",
            Category::Tools => "tools",
            Category::Databases => "databases",
            Category::Infrastructure => "infrastructure",
            Category::Platforms => "platforms",
        };
        f.write_str(name)
    }
}

struct Term {
    category: Category,
    name: &'static str,
    pattern: Regex,
}

static TERMS: Lazy<Vec<Term>> = Lazy::new(|| {
    Category::ALL
        .iter()
        .flat_map(|&category| {
            category.vocabulary().iter().map(move |&name| Term {
                category,
                name,
                pattern: Regex::new(&term_pattern(name)).expect("vocabulary terms compile"),
            })
        })
        .collect()
});

fn term_pattern(term: &str) -> String {
    let body = regex::escape(term)
        .replace(r"\.", r"[.\s]")
        .replace(' ', r"[.\s]");
    format!(r"(?:^|[^a-z0-9_]){body}(?:$|[^a-z0-9_])")
}

/// Technologies found in one text, per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechStack {
    /// Every category is present, possibly with an empty set.
    #[serde(flatten)]
    pub categories: BTreeMap<Category, BTreeSet<String>>,
    /// Signal strength in `[0, 1]`, two decimals.
    pub confidence: f64,
}

impl TechStack {
    /// Technologies matched in `category`.
    pub fn get(&self, category: Category) -> impl Iterator<Item = &str> {
        self.categories
            .get(&category)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of matches across all categories.
    pub fn total_matches(&self) -> usize {
        self.categories.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_matches() == 0
    }
}

/// Classify `content` (and an optional `title`) against the vocabulary.
pub fn classify(content: &str, title: Option<&str>) -> TechStack {
    let full_text = format!("{} {}", title.unwrap_or_default(), content).to_lowercase();

    let mut categories: BTreeMap<Category, BTreeSet<String>> =
        Category::ALL.iter().map(|&c| (c, BTreeSet::new())).collect();
    for term in TERMS.iter().filter(|t| t.pattern.is_match(&full_text)) {
        categories
            .entry(term.category)
            .or_default()
            .insert(term.name.to_string());
    }

    let matches = categories.values().map(BTreeSet::len).sum::<usize>() as f64;
    let length_score = (full_text.chars().count() as f64 / 5000.0).min(0.3);
    let confidence = (matches / 10.0 + length_score).min(1.0);

    TechStack {
        categories,
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_database_term() {
        let stack = classify("Redis", None);
        let databases: Vec<&str> = stack.get(Category::Databases).collect();
        assert_eq!(databases, vec!["redis"]);
        for category in Category::ALL.into_iter().filter(|c| *c != Category::Databases) {
            assert_eq!(stack.get(category).count(), 0, "{category} should be empty");
        }
        assert!(stack.confidence > 0.0 && stack.confidence < 0.11);
    }

    #[test]
    fn test_every_category_present() {
        let stack = classify("", None);
        assert_eq!(stack.categories.len(), 7);
        assert!(stack.is_empty());
        assert_eq!(stack.confidence, 0.0);
    }

    #[test]
    fn test_whole_word_matching() {
        let stack = classify("We moved from google cloud to a rusty stack", None);
        assert_eq!(stack.get(Category::Languages).count(), 0);

        let stack = classify("Redisを使ったキャッシュとGoの並行処理", Some("Go入門"));
        assert!(stack.get(Category::Databases).any(|t| t == "redis"));
        assert!(stack.get(Category::Languages).any(|t| t == "go"));
    }

    #[test]
    fn test_symbols_and_separators() {
        let stack = classify("Written in C++ and C#, deployed with Next.js and Spring Boot", None);
        let languages: Vec<&str> = stack.get(Category::Languages).collect();
        assert!(languages.contains(&"c++"));
        assert!(languages.contains(&"c#"));
        let frameworks: Vec<&str> = stack.get(Category::Frameworks).collect();
        assert!(frameworks.contains(&"next.js"));
        assert!(frameworks.contains(&"spring boot"));
        assert!(frameworks.contains(&"spring"));
    }

    #[test]
    fn test_term_in_two_categories_counts_twice() {
        let stack = classify("typescript", None);
        assert!(stack.get(Category::Languages).any(|t| t == "typescript"));
        assert!(stack.get(Category::Libraries).any(|t| t == "typescript"));
        assert_eq!(stack.total_matches(), 2);
    }

    #[test]
    fn test_confidence_is_capped() {
        let text = "react vue angular svelte docker kubernetes aws gcp redis mysql rust go ".repeat(50);
        let stack = classify(&text, None);
        assert_eq!(stack.confidence, 1.0);
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(classify("Docker on AWS", None)).unwrap();
        assert_eq!(json["infrastructure"], serde_json::json!(["aws", "docker"]));
        assert!(json["languages"].as_array().unwrap().is_empty());
        assert!(json["confidence"].is_number());
    }
}

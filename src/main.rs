//! # Zenn Scout
//!
//! Command-line front end: discover articles for a keyword or extract one
//! article by URL, analyze the tech stack, optionally summarize with an LLM,
//! and print a JSON or Markdown report.
//!
//! ## Usage
//!
//! ```sh
//! zenn_scout "React Hooks" --fetch-articles -j ./reports
//! zenn_scout https://zenn.dev/alice/articles/rust-async --markdown
//! ```
//!
//! Logs go to stderr so stdout carries only the report.

use clap::Parser;
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use zenn_scout::classifier::classify;
use zenn_scout::cli::{Cli, Target};
use zenn_scout::config::ScraperConfig;
use zenn_scout::outputs::markdown::ReportMarkdown;
use zenn_scout::outputs::{ArticleReport, FailedExtraction, Report, json};
use zenn_scout::summarizer::{ChatSummarizer, SummaryInput, summarize_with_backoff};
use zenn_scout::utils::ensure_writable_dir;
use zenn_scout::{ArticleContent, ArticleExtractor, DiscoveryCascade, DiscoveryRequest, DiscoveryResult};

/// Article extractions running at once; each may hold a browser session.
const PARALLEL_EXTRACTIONS: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = Instant::now();
    info!("zenn_scout starting up");

    let args = Cli::parse();
    debug!(input = %args.input, limit = args.limit.get(), kind = %args.kind, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => ScraperConfig::load(Path::new(path)).await?,
        None => ScraperConfig::default(),
    };
    if args.no_browser {
        config.browser.enabled = false;
    }

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, args.timeout_secs.map(Duration::from_secs));

    let mut report = Report::new(args.input.trim());
    match args.target(&config.site) {
        Target::Article(url) => {
            let extractor = ArticleExtractor::from_config(&config)?;
            match extractor.extract(&url, &cancel).await {
                Ok(article) => report.articles.push(analyze(article)),
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => {
                    error!(%url, error = %e, "Article extraction failed");
                    report.failures.push(FailedExtraction {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }
        Target::Keyword(keyword) => {
            let cascade = DiscoveryCascade::from_config(&config)?;
            let request = DiscoveryRequest::new(keyword)
                .with_limit(args.limit)
                .with_kind(args.kind);
            let discovery = cascade.discover(&request, &cancel).await?;
            info!(
                tier = %discovery.tier_used,
                count = discovery.articles.len(),
                "Discovery complete"
            );

            if args.fetch_articles && !discovery.is_placeholder() {
                let extractor = ArticleExtractor::from_config(&config)?;
                extract_batch(&extractor, &discovery, &cancel, &mut report).await?;
            }
            report.discovery = Some(discovery);
        }
    }

    if args.summarize {
        summarize_report(&args, &mut report, &cancel).await?;
    }

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_report(&report, dir).await {
            error!(error = %e, "Failed to write JSON report");
        }
    }

    if args.markdown {
        print!("{}", ReportMarkdown(&report));
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = report.articles.len(),
        failures = report.failures.len(),
        "Execution complete"
    );
    Ok(())
}

/// Cancel `cancel` on Ctrl-C, and after `deadline` when one is given.
fn spawn_cancel_triggers(cancel: &CancellationToken, deadline: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; cancelling");
            on_signal.cancel();
        }
    });

    if let Some(deadline) = deadline {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(?deadline, "Deadline reached; cancelling");
            on_deadline.cancel();
        });
    }
}

fn analyze(article: ArticleContent) -> ArticleReport {
    let tech_stack = classify(&article.body, Some(&article.title));
    debug!(url = %article.url, confidence = tech_stack.confidence, matches = tech_stack.total_matches(), "Classified article");
    ArticleReport {
        article,
        tech_stack,
        summary: None,
    }
}

/// Extract every discovered article; failures are recorded, not fatal.
#[instrument(level = "info", skip_all, fields(count = discovery.articles.len()))]
async fn extract_batch(
    extractor: &ArticleExtractor,
    discovery: &DiscoveryResult,
    cancel: &CancellationToken,
    report: &mut Report,
) -> Result<(), Box<dyn Error>> {
    let results: Vec<_> = stream::iter(discovery.articles.iter())
        .map(|summary| async move {
            let outcome = extractor.extract(&summary.url, cancel).await;
            (summary.url.clone(), outcome)
        })
        .buffered(PARALLEL_EXTRACTIONS)
        .collect()
        .await;

    for (url, outcome) in results {
        match outcome {
            Ok(article) => report.articles.push(analyze(article)),
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                warn!(%url, error = %e, "Extraction failed; skipping article");
                report.failures.push(FailedExtraction {
                    url,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        successful = report.articles.len(),
        failed = report.failures.len(),
        "Completed batch extraction"
    );
    Ok(())
}

/// Attach LLM summaries to the report. Summarizer failures are logged and
/// leave the summary empty.
#[instrument(level = "info", skip_all)]
async fn summarize_report(
    args: &Cli,
    report: &mut Report,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let client = ChatSummarizer::new(
        &args.llm_base_url,
        args.llm_api_key.clone(),
        &args.llm_model,
        Duration::from_secs(120),
    )?;

    for entry in &mut report.articles {
        let input = SummaryInput::article(&entry.article, &entry.tech_stack);
        entry.summary = tokio::select! {
            _ = cancel.cancelled() => return Err(zenn_scout::Cancelled.into()),
            summary = summarize_with_backoff(client.clone(), &input) => summary.ok(),
        };
    }

    // Keyword runs without extracted articles get one summary of the hit list.
    if report.articles.is_empty() {
        if let Some(discovery) = report.discovery.as_ref().filter(|d| !d.is_placeholder()) {
            let text = discovery
                .articles
                .iter()
                .map(|a| format!("{} {}", a.title, a.excerpt()))
                .collect::<Vec<_>>()
                .join("\n");
            let stack = classify(&text, Some(&discovery.keyword));
            let input = SummaryInput::discovery(discovery, &stack);
            report.summary = tokio::select! {
                _ = cancel.cancelled() => return Err(zenn_scout::Cancelled.into()),
                summary = summarize_with_backoff(client.clone(), &input) => summary.ok(),
            };
        }
    }
    Ok(())
}

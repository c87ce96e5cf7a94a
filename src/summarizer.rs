//! LLM summarization of discovered or extracted articles, with exponential backoff.
//!
//! The summarizer sits downstream of the pipeline: it consumes a
//! [`DiscoveryResult`] or an [`ArticleContent`] together with the
//! classifier's [`TechStack`] and produces prose. Nothing in discovery or
//! extraction depends on it.
//!
//! # Architecture
//!
//! - [`Summarize`]: core trait for async summarization
//! - [`ChatSummarizer`]: OpenAI-compatible `/chat/completions` client
//! - [`RetrySummarize`]: decorator adding retry logic to any [`Summarize`] implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Client errors other than 408 and 429 are not retried

use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::classifier::{Category, TechStack};
use crate::models::{ArticleContent, DiscoveryResult};
use crate::utils::truncate_for_log;

/// System prompt describing the report layout the model must produce.
pub const SYSTEM_PROMPT: &str = r#"You are an assistant that summarizes technical articles published on Zenn.

You receive either one article (title, author, publication date, URL and body) or
a list of search results for a keyword, plus the technology stack detected in the
text. Write the summary in Markdown using exactly this layout:

## 📝 Article Summary

**Title**: [article title]
**Author**: [author name]
**Published**: [publication date]
**URL**: [article URL]

### 🎯 Key Points
- [point 1]
- [point 2]
- [point 3]

### 🛠️ Tech Stack
**Languages**: [programming languages]
**Frameworks**: [frameworks]
**Libraries**: [libraries]
**Tools**: [development tools]
**Databases**: [databases]
**Infrastructure**: [infrastructure and cloud]

### 💡 Technical Content
[technical details]

### 🚀 Implementation
[concrete implementation approach or solution]

### ⚠️ Caveats
[pitfalls and open issues]

### 👥 Audience
[who will find this article useful]

For a list of search results, repeat the layout for each article, using the
excerpt in place of the body. Never invent facts that are not in the input."#;

/// Errors from the summarization collaborator.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM response contained no message")]
    EmptyResponse,

    #[error("cannot encode summary input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid summarizer configuration: {0}")]
    Config(String),
}

impl SummarizeError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizeError::Status { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            SummarizeError::Encode(_) | SummarizeError::Config(_) => false,
            SummarizeError::Http(_) | SummarizeError::EmptyResponse => true,
        }
    }
}

/// What is being summarized.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Discovery(&'a DiscoveryResult),
    Article(&'a ArticleContent),
}

/// Input contract of the summarizer: a subject plus its detected tech stack.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub subject: Subject<'a>,
    pub stack: &'a TechStack,
}

impl<'a> SummaryInput<'a> {
    pub fn article(content: &'a ArticleContent, stack: &'a TechStack) -> Self {
        Self {
            subject: Subject::Article(content),
            stack,
        }
    }

    pub fn discovery(result: &'a DiscoveryResult, stack: &'a TechStack) -> Self {
        Self {
            subject: Subject::Discovery(result),
            stack,
        }
    }

    /// Render the user message sent alongside [`SYSTEM_PROMPT`].
    pub fn to_prompt(&self) -> Result<String, SummarizeError> {
        let (label, payload) = match self.subject {
            Subject::Article(content) => ("Article", serde_json::to_string_pretty(content)?),
            Subject::Discovery(result) => ("Search results", serde_json::to_string_pretty(result)?),
        };

        let mut stack_lines = String::new();
        for category in Category::ALL {
            let names: Vec<&str> = self.stack.get(category).collect();
            let names = if names.is_empty() { "-".to_string() } else { names.join(", ") };
            stack_lines.push_str(&format!("- {category}: {names}\n"));
        }

        Ok(format!(
            "{label}:\n```json\n{payload}\n```\n\nDetected tech stack (confidence {:.2}):\n{stack_lines}",
            self.stack.confidence
        ))
    }
}

/// Trait for async summarization.
///
/// Implementors turn a [`SummaryInput`] into prose. This abstraction allows
/// for different LLM backends or decorators (like retry logic).
pub trait Summarize {
    /// Summarize `input`.
    ///
    /// # Errors
    ///
    /// Any [`SummarizeError`]; callers treat a failed summary as non-fatal.
    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String, SummarizeError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`Summarize`] implementation.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetrySummarize<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetrySummarize<T>
where
    T: Summarize,
{
    /// Wrap `inner`, retrying up to `max_retries` times.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ChatSummarizer::new("https://api.openai.com/v1", key, "gpt-4.1", timeout)?;
    /// let retrying = RetrySummarize::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt - 1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetrySummarize<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySummarize")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Summarize for RetrySummarize<T>
where
    T: Summarize,
{
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String, SummarizeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.summarize(input).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64;
                    let elapsed_ms_total = total_t0.elapsed().as_millis() as u64;

                    if attempt > self.max_retries || !e.is_retryable() {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "summarize() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

impl ChatSummarizer {
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://api.openai.com/v1`
    /// * `api_key` - Bearer token; omitted for local servers that need none
    /// * `model` - Model name sent with every request
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// [`SummarizeError::Config`] when `base_url` is not a URL.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: StdDuration,
    ) -> Result<Self, SummarizeError> {
        let endpoint = Url::parse(&format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .map_err(|e| SummarizeError::Config(format!("bad base URL `{base_url}`: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.to_string(),
        })
    }
}

impl Summarize for ChatSummarizer {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String, SummarizeError> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: input.to_prompt()?,
                },
            ],
            temperature: 0.3,
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "LLM call rejected");
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let summary = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = summary.chars().count(),
            "LLM call succeeded"
        );
        Ok(summary)
    }
}

/// Summarize `input` through `summarizer` with the standard retry policy.
///
/// # Retry Behavior
///
/// - Up to 5 retry attempts
/// - Exponential backoff: 1s, 2s, 4s, 8s, 16s (capped at 30s)
/// - Random jitter added to prevent thundering herd
#[instrument(level = "info", skip_all)]
pub async fn summarize_with_backoff(
    summarizer: ChatSummarizer,
    input: &SummaryInput<'_>,
) -> Result<String, SummarizeError> {
    let t0 = Instant::now();
    let api = RetrySummarize::new(summarizer, 5, StdDuration::from_secs(1));
    let res = api.summarize(input).await;
    let elapsed_ms_total = t0.elapsed().as_millis() as u64;

    match &res {
        Ok(_) => info!(elapsed_ms_total, "summarize_with_backoff succeeded"),
        Err(e) => error!(elapsed_ms_total, error = %e, "summarize_with_backoff failed"),
    }
    res
}

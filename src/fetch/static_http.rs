//! Tiers 2 and 3: plain HTTP GET with a browser-identifying user agent.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use url::Url;

use super::PageSource;
use crate::config::HttpConfig;
use crate::error::{Cancelled, Error};
use crate::models::Tier;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches pre-hydration markup over HTTP.
///
/// The same client serves the static search tier and the fallback listing
/// tier; `tier` only changes how results are tagged.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
    tier: Tier,
}

impl StaticFetcher {
    /// Build a client carrying the configured identity headers and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a header value is not valid ASCII or
    /// the TLS backend fails to initialise.
    pub fn new(http: &HttpConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&http.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, header_value(&http.accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(http.timeout())
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            tier: Tier::Static,
        })
    }

    /// Same client, tagged as another tier.
    pub fn for_tier(&self, tier: Tier) -> Self {
        Self {
            client: self.client.clone(),
            tier,
        }
    }

    async fn get(&self, url: &Url) -> Result<String, Error> {
        let failed = |reason: String| Error::StaticFetch {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| failed(e.to_string()))
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(raw).map_err(|e| Error::Config(format!("invalid header value `{raw}`: {e}")))
}

#[async_trait]
impl PageSource for StaticFetcher {
    fn tier(&self) -> Tier {
        self.tier
    }

    #[instrument(level = "info", skip_all, fields(%url, tier = %self.tier))]
    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<String, Error> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            fetched = self.get(url) => fetched,
        };

        match &outcome {
            Ok(body) => info!(bytes = body.len(), "Fetched static markup"),
            Err(e) => warn!(error = %e, "Static fetch failed"),
        }
        outcome
    }
}

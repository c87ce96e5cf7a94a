//! Tier 1: scripted browser rendering via chromiumoxide.
//!
//! A [`RenderedFetcher`] launches one browser session per call, navigates,
//! waits for the navigation to settle, sleeps a fixed settle delay for late
//! client-side hydration, and snapshots the live DOM. The session is
//! released exactly once on every exit path, including errors and
//! cancellation.
//!
//! The browser is reached through the [`BrowserLauncher`] / [`BrowserSession`]
//! traits so the lifecycle can be exercised without a Chromium install.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::PageSource;
use crate::config::BrowserSettings;
use crate::error::{BrowserError, Cancelled, Error};
use crate::models::Tier;

/// Starts a fresh browser session.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser tab, owned by a single fetch.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and wait for the navigation to settle.
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), BrowserError>;

    /// Serialized HTML of the current live DOM.
    async fn snapshot(&mut self) -> Result<String, BrowserError>;

    /// Tear the session down. Failures are logged, never returned.
    async fn release(self: Box<Self>);
}

/// Tier-1 page source backed by a scripted browser.
pub struct RenderedFetcher<L = ChromiumLauncher> {
    launcher: L,
    navigation_timeout: Duration,
    settle_delay: Duration,
    release_timeout: Duration,
}

/// Default bound on session teardown before a fetch reports its outcome.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(20);

impl<L: BrowserLauncher> RenderedFetcher<L> {
    pub fn new(launcher: L, settings: &BrowserSettings) -> Self {
        Self::with_timings(launcher, settings.navigation_timeout(), settings.settle_delay())
    }

    pub fn with_timings(launcher: L, navigation_timeout: Duration, settle_delay: Duration) -> Self {
        Self {
            launcher,
            navigation_timeout,
            settle_delay,
            release_timeout: RELEASE_TIMEOUT,
        }
    }

    pub fn with_release_timeout(mut self, release_timeout: Duration) -> Self {
        self.release_timeout = release_timeout;
        self
    }

    async fn load(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
    ) -> Result<String, BrowserError> {
        session.navigate(url, self.navigation_timeout).await?;
        debug!(settle_ms = self.settle_delay.as_millis() as u64, "Navigation settled; waiting for hydration");
        tokio::time::sleep(self.settle_delay).await;
        session.snapshot().await
    }
}

#[async_trait]
impl<L: BrowserLauncher> PageSource for RenderedFetcher<L> {
    fn tier(&self) -> Tier {
        Tier::Rendered
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<String, Error> {
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            launched = self.launcher.launch() => launched.map_err(|source| Error::RenderFetch {
                url: url.clone(),
                source,
            })?,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::from(Cancelled)),
            loaded = self.load(&mut *session, url) => loaded.map_err(|source| Error::RenderFetch {
                url: url.clone(),
                source,
            }),
        };

        if tokio::time::timeout(self.release_timeout, session.release())
            .await
            .is_err()
        {
            warn!(timeout = ?self.release_timeout, "Browser session release timed out; abandoning it");
        }

        match &outcome {
            Ok(html) => info!(bytes = html.len(), "Captured rendered DOM"),
            Err(e) => warn!(error = %e, "Rendered fetch failed"),
        }
        outcome
    }
}

/// Launches headless Chromium through chromiumoxide.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    headless: bool,
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(settings: &BrowserSettings, user_agent: &str) -> Self {
        Self {
            executable: settings.chrome_executable.clone(),
            headless: settings.headless,
            user_agent: user_agent.to_string(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.user_agent));
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Box::new(ChromiumSession {
                browser,
                page,
                handler_task,
            })),
            Err(e) => {
                shutdown_browser(browser, handler_task).await;
                Err(BrowserError::Launch(format!("failed to open tab: {e}")))
            }
        }
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), BrowserError> {
        let page = &self.page;
        let settle = async move {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, settle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation(e.to_string())),
            Err(_) => Err(BrowserError::Timeout(timeout)),
        }
    }

    async fn snapshot(&mut self) -> Result<String, BrowserError> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Snapshot(e.to_string()))
    }

    async fn release(self: Box<Self>) {
        let ChromiumSession {
            browser,
            page,
            handler_task,
        } = *self;

        match tokio::time::timeout(SHUTDOWN_GRACE, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Closing tab failed"),
            Err(_) => debug!("Closing tab timed out"),
        }
        shutdown_browser(browser, handler_task).await;
        debug!("Browser session released");
    }
}

/// Upper bound on each step of browser teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Close the browser, killing the child process when a graceful close fails,
/// and stop the CDP handler. Never waits longer than a few grace periods.
async fn shutdown_browser(mut browser: Browser, handler_task: JoinHandle<()>) {
    let closed = match tokio::time::timeout(SHUTDOWN_GRACE, browser.close()).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Closing browser failed; killing process");
            false
        }
        Err(_) => {
            warn!(grace = ?SHUTDOWN_GRACE, "Closing browser timed out; killing process");
            false
        }
    };
    if !closed {
        if let Some(Err(e)) = browser.kill().await {
            warn!(error = %e, "Killing browser process failed");
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, browser.wait()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!(error = %e, "Waiting for browser exit failed"),
        Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "Browser process did not exit in time"),
    }
    handler_task.abort();
}

//! Page capability used by the best-seller and brand-brief pipelines.
//!
//! The pipelines only need a handful of browser operations, expressed here as
//! typed methods rather than raw in-page scripts. Any automation backend that
//! can satisfy them is substitutable; [`HttpPage`] is the built-in one.

mod dom;
mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;

pub use http::{HttpPage, PageCookie};

/// Lifecycle event a navigation waits for before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    #[default]
    DomContentLoaded,
    Load,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitUntil::DomContentLoaded,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sub-resource classes a page can be told not to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Font,
    Stylesheet,
    Image,
    Media,
}

/// Browser-like page handle. Used sequentially by one pipeline at a time.
#[async_trait]
pub trait Page: Send + Sync {
    /// Current page URL (`about:blank` before the first navigation).
    async fn url(&self) -> Result<String, ScrapeError>;
    /// Full serialized HTML of the current document.
    async fn content(&self) -> Result<String, ScrapeError>;
    /// Outer HTML of `<body>` in the current (possibly mutated) document.
    async fn body_html(&self) -> Result<String, ScrapeError>;
    async fn goto(&mut self, url: &str, options: GotoOptions) -> Result<(), ScrapeError>;
    async fn reload(&mut self) -> Result<(), ScrapeError>;
    /// Stops loading the given resource kinds for subsequent navigations.
    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), ScrapeError>;
    /// Scrolls to the full document height to trigger lazy-loaded content.
    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError>;
    /// Detaches every element matching any of `selectors`; returns the count.
    async fn remove_elements(&mut self, selectors: &[&str]) -> Result<usize, ScrapeError>;
    /// PNG screenshot of the viewport, when the backend can render one.
    async fn screenshot(&self) -> Result<Option<Vec<u8>>, ScrapeError>;
}

const DEFAULT_SCROLL_PAUSE: Duration = Duration::from_millis(1500);

/// Navigation retry policy for transient failures (timeouts, connection
/// errors, 5xx).
#[derive(Debug, Clone, Copy)]
pub struct NavigationPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Pause after scrolling so lazy-loaded content can arrive.
    pub scroll_pause: Duration,
}

impl NavigationPolicy {
    #[must_use]
    pub fn from_app_config(config: &brandscope_core::AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_attempts: config.nav_max_attempts.max(1),
            retry_delay: Duration::from_millis(config.nav_retry_delay_ms),
            scroll_pause: DEFAULT_SCROLL_PAUSE,
        }
    }

    #[must_use]
    pub fn goto_options(&self) -> GotoOptions {
        GotoOptions {
            wait_until: WaitUntil::DomContentLoaded,
            timeout: self.timeout,
        }
    }
}

/// Navigates with a fixed number of attempts and a fixed delay between them.
///
/// Only transient failures are repeated; anything else (including access
/// denial) is returned immediately. When attempts run out the last error is
/// returned.
///
/// # Errors
///
/// Returns the final [`ScrapeError`] from `goto`.
pub async fn goto_with_retry<P>(
    page: &mut P,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<(), ScrapeError>
where
    P: Page + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match page.goto(url, policy.goto_options()).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if !err.is_transient_navigation() || attempt >= max_attempts {
                    return Err(err);
                }
                tracing::warn!(
                    url,
                    attempt,
                    max_attempts,
                    error = %err,
                    "navigation failed, retrying"
                );
            }
        }
        tokio::time::sleep(policy.retry_delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
pub(crate) mod fake;
